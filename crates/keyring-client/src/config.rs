//! Keyring backend client configuration.
//!
//! The authenticated endpoints need an API key issued to the integrating
//! application. The public policy listing needs none, so a keyless
//! configuration per [`Environment`] is also available.

use std::time::Duration;

use keyring_core::{ConfigError, Environment};
use url::Url;
use zeroize::Zeroizing;

use crate::retry::RetryPolicy;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the Keyring backend.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct KeyringApiConfig {
    /// Backend base URL.
    pub base_url: Url,
    /// Value of the `X-API-KEY` header. `None` sends no header.
    pub api_key: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport retry budget.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for KeyringApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl KeyringApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KEYRING_API_URL` (required)
    /// - `KEYRING_API_KEY` (required)
    /// - `KEYRING_TIMEOUT_SECS` (default: 30)
    /// - `KEYRING_API_MAX_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::Missing(var.to_string()))
        };
        let raw_url = required("KEYRING_API_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("KEYRING_API_URL".to_string(), e.to_string()))?;
        let api_key = Zeroizing::new(required("KEYRING_API_KEY")?);
        let number = |var: &str| match lookup(var) {
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw.clone())),
            None => Ok(None),
        };
        let timeout_secs = number("KEYRING_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let mut retry = RetryPolicy::default();
        if let Some(max_retries) = number("KEYRING_API_MAX_RETRIES")? {
            retry.max_retries = u32::try_from(max_retries).map_err(|_| {
                ConfigError::InvalidNumber(
                    "KEYRING_API_MAX_RETRIES".to_string(),
                    max_retries.to_string(),
                )
            })?;
        }
        Ok(Self {
            base_url,
            api_key: Some(api_key),
            timeout_secs,
            retry,
        })
    }

    /// Keyless configuration for an environment's public API.
    pub fn public(environment: Environment) -> Result<Self, ConfigError> {
        let base_url = Url::parse(environment.api_base_url())
            .map_err(|e| ConfigError::InvalidUrl(environment.to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a configuration pointing to a local mock server (for testing).
    ///
    /// Retries keep the default count with a 10 ms base delay.
    pub fn local_mock(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))?;
        Ok(Self {
            base_url,
            api_key: Some(Zeroizing::new(api_key.to_string())),
            timeout_secs: 5,
            retry: RetryPolicy {
                base_delay: Duration::from_millis(10),
                ..RetryPolicy::default()
            },
        })
    }
}
