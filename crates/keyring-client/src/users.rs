//! User endpoints, including the blinded signature exchange.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/api/l1/users` | Create user |
//! | GET | `/api/l1/users?page=&page_size=` | List users |
//! | GET | `/api/l1/users/{id}` | Get user |
//! | GET | `/api/l1/user/{id}/policy/{policy}/user-status` | Attestation status |
//! | POST | `/api/l1/users/{id}/policies/{policy}/validate-data` | Validate onboarding data |
//! | POST | `/api/l1/users/{id}/policy/{policy}/get-blinded-signature` | Blinded signature |
//!
//! The singular `user/` and `policy/` segments are what the backend
//! serves; they are not typos.

use crate::error::KeyringApiError;
use crate::retry::Idempotency;
use crate::types::{
    BlindedSignatureRequest, BlindedSignatureResponse, CreateUserRequest, PaginatedResponse, User,
    UserStatus, ValidateDataResponse,
};
use crate::KeyringClient;

fn require(field: &'static str, value: &str) -> Result<(), KeyringApiError> {
    if value.trim().is_empty() {
        return Err(KeyringApiError::MissingField(field));
    }
    Ok(())
}

impl KeyringClient {
    /// Register a user.
    ///
    /// Calls `POST {base_url}/api/l1/users`. All three fields are required.
    /// A request that timed out is not sent again, so a duplicate user is
    /// never created behind the caller's back.
    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User, KeyringApiError> {
        require("email", &req.email)?;
        require("first_name", &req.first_name)?;
        require("last_name", &req.last_name)?;

        let endpoint = "POST /api/l1/users";
        let url = self.url(&["api", "l1", "users"])?;

        let resp = self
            .send(endpoint, Idempotency::Once, |http| {
                http.post(url.clone()).json(req).send()
            })
            .await?;

        Self::read_json(endpoint, resp).await
    }

    /// List users.
    ///
    /// Calls `GET {base_url}/api/l1/users?page={page}&page_size={page_size}`.
    pub async fn users(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResponse<User>, KeyringApiError> {
        let endpoint = "GET /api/l1/users";
        let url = self.paged_url(&["api", "l1", "users"], page, page_size)?;

        let resp = self
            .send(endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        Self::read_json(endpoint, resp).await
    }

    /// Get a user by ID. Returns `None` when the backend answers 404.
    ///
    /// Calls `GET {base_url}/api/l1/users/{id}`.
    pub async fn user(&self, id: &str) -> Result<Option<User>, KeyringApiError> {
        require("user_id", id)?;
        let endpoint = format!("GET /api/l1/users/{id}");
        let url = self.url(&["api", "l1", "users", id])?;

        let resp = self
            .send(&endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::read_json(&endpoint, resp).await.map(Some)
    }

    /// Attestation status of a user for one policy.
    ///
    /// Calls `GET {base_url}/api/l1/user/{id}/policy/{policy_id}/user-status`.
    pub async fn user_status(
        &self,
        id: &str,
        policy_id: u64,
    ) -> Result<UserStatus, KeyringApiError> {
        require("user_id", id)?;
        let policy = policy_id.to_string();
        let endpoint = format!("GET /api/l1/user/{id}/policy/{policy}/user-status");
        let url = self.url(&["api", "l1", "user", id, "policy", &policy, "user-status"])?;

        let resp = self
            .send(&endpoint, Idempotency::Idempotent, |http| {
                http.get(url.clone()).send()
            })
            .await?;

        Self::read_json(&endpoint, resp).await
    }

    /// Validate onboarding data against a policy.
    ///
    /// The backend only checks the data, so the request is retried like a
    /// read.
    ///
    /// Calls `POST {base_url}/api/l1/users/{id}/policies/{policy_id}/validate-data`
    /// with `data` as the request body.
    pub async fn validate_data(
        &self,
        id: &str,
        policy_id: u64,
        data: &serde_json::Value,
    ) -> Result<ValidateDataResponse, KeyringApiError> {
        require("user_id", id)?;
        if data.is_null() {
            return Err(KeyringApiError::MissingField("data"));
        }
        let policy = policy_id.to_string();
        let endpoint = format!("POST /api/l1/users/{id}/policies/{policy}/validate-data");
        let url = self.url(&["api", "l1", "users", id, "policies", &policy, "validate-data"])?;

        let resp = self
            .send(&endpoint, Idempotency::Idempotent, |http| {
                http.post(url.clone()).json(data).send()
            })
            .await?;

        Self::read_json(&endpoint, resp).await
    }

    /// Exchange a proof for the issuer's signature over the blinded message.
    ///
    /// Not replayed after a timeout: the issuer may already have signed.
    ///
    /// Calls `POST {base_url}/api/l1/users/{id}/policy/{policy_id}/get-blinded-signature`.
    /// The proof and public signals are sent exactly as the prover produced
    /// them; the backend verifies the proof before signing.
    pub async fn blinded_signature(
        &self,
        id: &str,
        policy_id: u64,
        req: &BlindedSignatureRequest,
    ) -> Result<BlindedSignatureResponse, KeyringApiError> {
        require("user_id", id)?;
        if req.proof.is_null() {
            return Err(KeyringApiError::MissingField("proof"));
        }
        if req.public_signals.is_empty() {
            return Err(KeyringApiError::MissingField("public_signals"));
        }
        let policy = policy_id.to_string();
        let endpoint = format!("POST /api/l1/users/{id}/policy/{policy}/get-blinded-signature");
        let segments = ["api", "l1", "users", id, "policy", &policy, "get-blinded-signature"];
        let url = self.url(&segments)?;

        let resp = self
            .send(&endpoint, Idempotency::Once, |http| {
                http.post(url.clone()).json(req).send()
            })
            .await?;

        let signed: BlindedSignatureResponse = Self::read_json(&endpoint, resp).await?;
        tracing::debug!(user_id = id, policy_id, "received blinded signature");
        Ok(signed)
    }
}
