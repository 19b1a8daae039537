//! Policy endpoints.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/api/l1/policies?page=&page_size=` | Paginated policies of the application |
//! | GET | `/api/v1/policies/public` | Public listing, no API key needed |
//! | GET | `/api/l1/onboarding-schema` | JSON schema of the onboarding form |

use keyring_core::Policy;

use crate::error::KeyringApiError;
use crate::types::PaginatedResponse;
use crate::retry::Idempotency;
use crate::KeyringClient;

impl KeyringClient {
    /// List the application's policies.
    ///
    /// Calls `GET {base_url}/api/l1/policies?page={page}&page_size={page_size}`.
    pub async fn policies(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResponse<Policy>, KeyringApiError> {
        let endpoint = "GET /api/l1/policies";
        let url = self.paged_url(&["api", "l1", "policies"], page, page_size)?;

        let resp = self
            .send(endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        Self::read_json(endpoint, resp).await
    }

    /// List all public policies of the environment.
    ///
    /// Calls `GET {base_url}/api/v1/policies/public`. Works with a keyless
    /// [`KeyringApiConfig::public`](crate::KeyringApiConfig::public) client.
    pub async fn public_policies(&self) -> Result<PaginatedResponse<Policy>, KeyringApiError> {
        let endpoint = "GET /api/v1/policies/public";
        let url = self.url(&["api", "v1", "policies", "public"])?;

        let resp = self
            .send(endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        Self::read_json(endpoint, resp).await
    }

    /// Public policies usable with Keyring Connect.
    ///
    /// [`public_policies`](Self::public_policies) filtered to
    /// `policy_type == "connect"`.
    pub async fn connect_policies(&self) -> Result<Vec<Policy>, KeyringApiError> {
        let page = self.public_policies().await?;
        let policies: Vec<Policy> = page.results.into_iter().filter(Policy::is_connect).collect();
        tracing::debug!(count = policies.len(), "fetched connect policies");
        Ok(policies)
    }

    /// Fetch the onboarding form schema.
    ///
    /// Calls `GET {base_url}/api/l1/onboarding-schema`. The schema is opaque
    /// to this client and returned as raw JSON.
    pub async fn onboarding_schema(&self) -> Result<serde_json::Value, KeyringApiError> {
        let endpoint = "GET /api/l1/onboarding-schema";
        let url = self.url(&["api", "l1", "onboarding-schema"])?;

        let resp = self
            .send(endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        Self::read_json(endpoint, resp).await
    }
}
