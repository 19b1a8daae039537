//! # keyring-client -- Typed Rust client for the Keyring backend
//!
//! Covers the endpoints an integrating application needs around proof
//! generation:
//! - **Policies**: paginated L1 listing, the keyless public listing, and
//!   the onboarding schema.
//! - **Users**: create, list, fetch, attestation status, onboarding data
//!   validation.
//! - **Blinded signatures**: exchange a Groth16 proof for the issuer's
//!   signature over the blinded message.
//!
//! ## Authentication
//!
//! Authenticated endpoints expect the application API key in the
//! `X-API-KEY` header. The key is set once as a default header on the
//! shared `reqwest::Client` and never logged.
//!
//! ## Errors
//!
//! Non-2xx responses surface as [`KeyringApiError::Api`] carrying the
//! upstream status and the `detail`/`error` message.
//!
//! ## Retries
//!
//! Transport failures are retried with exponential backoff under the
//! [`RetryPolicy`] in [`KeyringApiConfig::retry`]; HTTP responses never
//! are. Requests that create state on the backend (`create_user`,
//! `blinded_signature`) are [`Idempotency::Once`] and only retried when the
//! connection could not be established.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod policies;
pub mod retry;
pub mod types;
pub mod users;

pub use config::KeyringApiConfig;
pub use error::KeyringApiError;
pub use retry::{Idempotency, RetryPolicy};
pub use types::{
    BlindedSignatureRequest, BlindedSignatureResponse, CreateUserRequest, PaginatedResponse, User,
    UserStatus, ValidateDataResponse,
};

use std::time::Duration;

use keyring_core::ConfigError;
use url::Url;

/// Header carrying the application API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Keyring backend client.
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct KeyringClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl KeyringClient {
    /// Create a new client from configuration.
    pub fn new(config: KeyringApiConfig) -> Result<Self, KeyringApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = reqwest::header::HeaderValue::from_str(key.as_str())
                .map_err(|_| ConfigError::InvalidValue("KEYRING_API_KEY".to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| KeyringApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Retry budget applied to every request.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Resolve `segments` below the base URL, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, KeyringApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConfigError::InvalidUrl("base_url".to_string(), self.base_url.to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Resolve `segments` and append `page`/`page_size` query parameters.
    pub(crate) fn paged_url(
        &self,
        segments: &[&str],
        page: u32,
        page_size: u32,
    ) -> Result<Url, KeyringApiError> {
        let mut url = self.url(segments)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());
        Ok(url)
    }

    /// Send a request built by `f` under the client's retry policy.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        idempotency: Idempotency,
        f: F,
    ) -> Result<reqwest::Response, KeyringApiError>
    where
        F: Fn(&reqwest::Client) -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        self.retry
            .send(endpoint, idempotency, || f(&self.http))
            .await
            .map_err(|e| KeyringApiError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            })
    }

    /// Decode a response body, mapping non-2xx statuses to API errors.
    pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, KeyringApiError> {
        if !resp.status().is_success() {
            return Err(error::api_error(endpoint, resp).await);
        }
        resp.json().await.map_err(|e| KeyringApiError::Deserialization {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}
