//! # Request Retries
//!
//! Transport failures are retried with exponential backoff. Any HTTP
//! response, including 4xx and 5xx, is returned to the caller as is.
//!
//! Whether a failed attempt may be repeated depends on the request:
//!
//! - [`Idempotency::Idempotent`] requests are retried on any transport
//!   error.
//! - [`Idempotency::Once`] requests create state on the backend (users,
//!   blinded signatures). They are retried only when no connection was
//!   made. A timeout after the body went out is returned to the caller.

use std::future::Future;
use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Retry budget of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles for every further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Whether a request may safely reach the backend more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Repeating the request has no further effect.
    Idempotent,
    /// The request must not be replayed once it may have been delivered.
    Once,
}

impl Idempotency {
    fn may_retry(self, error: &reqwest::Error) -> bool {
        match self {
            Self::Idempotent => true,
            Self::Once => error.is_connect(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Send a request built by `f`, retrying transport failures that
    /// `idempotency` allows.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        idempotency: Idempotency,
        f: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < self.max_retries && idempotency.may_retry(&e) => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        endpoint,
                        attempt,
                        max_retries = self.max_retries,
                        "Keyring API request failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::debug!(endpoint, ?idempotency, "not retrying request: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}
