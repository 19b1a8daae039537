//! # Time Sources
//!
//! Credential expiry is anchored to the backend clock, read from the `Date`
//! header of a cheap public endpoint. When that is disabled or unavailable,
//! local time minus a safety buffer is used instead.

use async_trait::async_trait;
use keyring_core::temporal::{buffered_now_ms, parse_http_date};

/// A source of the current time in unix milliseconds.
#[async_trait]
pub trait ServerClock: Send + Sync {
    /// Current time, or `None` when the source is unavailable.
    async fn now_ms(&self) -> Option<u64>;
}

/// Local time minus a fixed buffer.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    buffer_ms: u64,
}

impl LocalClock {
    /// Clock lagging local time by `buffer_ms`.
    pub fn new(buffer_ms: u64) -> Self {
        Self { buffer_ms }
    }
}

#[async_trait]
impl ServerClock for LocalClock {
    async fn now_ms(&self) -> Option<u64> {
        Some(buffered_now_ms(self.buffer_ms))
    }
}

/// Backend time from the HTTP `Date` header.
#[derive(Debug, Clone)]
pub struct HttpServerClock {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpServerClock {
    /// Clock reading `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ServerClock for HttpServerClock {
    async fn now_ms(&self) -> Option<u64> {
        let resp = match self.client.get(&self.endpoint).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "server time request failed");
                return None;
            }
        };
        let header = resp
            .headers()
            .get(reqwest::header::DATE)
            .and_then(|v| v.to_str().ok());
        match header.and_then(parse_http_date) {
            Some(ms) => Some(ms),
            None => {
                tracing::debug!(
                    endpoint = %self.endpoint,
                    "no usable server date, defaulting to client time"
                );
                None
            }
        }
    }
}

/// Server time with local fallback.
pub(crate) async fn resolve_now_ms(server: Option<&dyn ServerClock>, fallback: &LocalClock) -> u64 {
    if let Some(server) = server {
        if let Some(ms) = server.now_ms().await {
            return ms;
        }
    }
    buffered_now_ms(fallback.buffer_ms)
}
