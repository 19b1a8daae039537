//! Keyring backend client error types.

use keyring_core::ConfigError;

/// Errors from Keyring backend calls.
#[derive(Debug, thiserror::Error)]
pub enum KeyringApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Endpoint label, e.g. `GET /api/l1/policies`.
        endpoint: String,
        /// Transport error.
        source: reqwest::Error,
    },
    /// The backend returned a non-2xx status.
    #[error("Keyring API {endpoint} returned {status}: {detail}")]
    Api {
        /// Endpoint label.
        endpoint: String,
        /// Upstream HTTP status.
        status: u16,
        /// Upstream `detail` or `error` message, else the raw body.
        detail: String,
    },
    /// A required request field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        /// Endpoint label.
        endpoint: String,
        /// Decoding error.
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KeyringApiError {
    /// HTTP status to report for this error.
    ///
    /// Upstream status for API errors, 400 for missing fields, 500 for
    /// everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::MissingField(_) => 400,
            _ => 500,
        }
    }
}

/// Turn a non-2xx response into [`KeyringApiError::Api`].
pub(crate) async fn api_error(endpoint: &str, resp: reqwest::Response) -> KeyringApiError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    KeyringApiError::Api {
        endpoint: endpoint.to_string(),
        status,
        detail: error_detail(&body),
    }
}

/// Extract a human-readable message from an error body.
///
/// Prefers the JSON `detail` field, then `error`, then the raw body.
pub(crate) fn error_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    for field in ["detail", "error"] {
        match json.get(field) {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_detail_then_error() {
        assert_eq!(error_detail(r#"{"detail":"no such policy","error":"x"}"#), "no such policy");
        assert_eq!(error_detail(r#"{"error":"bad email"}"#), "bad email");
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","email"]}]}"#),
            r#"[{"loc":["body","email"]}]"#
        );
        assert_eq!(error_detail("upstream timeout"), "upstream timeout");
        assert_eq!(error_detail(r#"{"message":"m"}"#), r#"{"message":"m"}"#);
    }

    #[test]
    fn status_codes() {
        let api = KeyringApiError::Api {
            endpoint: "GET /x".into(),
            status: 404,
            detail: "not found".into(),
        };
        assert_eq!(api.status_code(), 404);
        assert_eq!(KeyringApiError::MissingField("email").status_code(), 400);
        assert_eq!(
            KeyringApiError::Config(ConfigError::Missing("KEYRING_API_KEY".into())).status_code(),
            500
        );
    }
}
