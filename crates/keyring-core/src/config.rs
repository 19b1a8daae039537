//! Proof-generation configuration.
//!
//! Defaults point to the production CDN and backend. Override via
//! environment variables, partial overrides, or explicit construction for
//! staging and tests.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Production endpoint whose `Date` header is used as the time source.
pub const DEFAULT_SERVER_TIME_ENDPOINT: &str =
    "https://main.api.keyring-backend.krnprod.net/api/v1/policies/public";

/// CDN directory holding the authorisation-construction artifacts.
pub const DEFAULT_ARTIFACT_BASE: &str = "https://main.cdn.krnprod.net/AuthorisationConstruction";

/// Safety margin subtracted from local time when server time is unused.
pub const DEFAULT_TIME_BUFFER_MS: u64 = 6000;

/// Absolute URLs of the three proving artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUrls {
    /// Groth16 proving key.
    pub z_key: String,
    /// Witness-calculator wasm.
    pub wasm: String,
    /// Circuit symbol map (JSON).
    pub symbol_map: String,
}

impl Default for ArtifactUrls {
    fn default() -> Self {
        Self {
            z_key: format!("{DEFAULT_ARTIFACT_BASE}/AuthorisationConstruction.01.zKey"),
            wasm: format!("{DEFAULT_ARTIFACT_BASE}/AuthorisationConstruction.wasm"),
            symbol_map: format!(
                "{DEFAULT_ARTIFACT_BASE}/AuthorisationConstruction.public.sym.json"
            ),
        }
    }
}

/// Configuration of the proof-generation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringZkpgConfig {
    /// Endpoint queried for the server `Date` header.
    pub server_time_endpoint: String,
    /// Artifact download locations.
    pub zk_artifacts: ArtifactUrls,
    /// Buffer subtracted from local time, in milliseconds.
    pub time_buffer_ms: u64,
}

impl Default for KeyringZkpgConfig {
    fn default() -> Self {
        Self {
            server_time_endpoint: DEFAULT_SERVER_TIME_ENDPOINT.to_string(),
            zk_artifacts: ArtifactUrls::default(),
            time_buffer_ms: DEFAULT_TIME_BUFFER_MS,
        }
    }
}

/// Partial configuration; every `Some` field replaces the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringZkpgConfigOverrides {
    /// Replacement time endpoint.
    pub server_time_endpoint: Option<String>,
    /// Replacement artifact URLs.
    pub zk_artifacts: Option<ArtifactUrls>,
    /// Replacement time buffer.
    pub time_buffer_ms: Option<u64>,
}

impl KeyringZkpgConfig {
    /// Apply overrides on top of this configuration.
    pub fn with_overrides(mut self, overrides: KeyringZkpgConfigOverrides) -> Self {
        if let Some(endpoint) = overrides.server_time_endpoint {
            self.server_time_endpoint = endpoint;
        }
        if let Some(urls) = overrides.zk_artifacts {
            self.zk_artifacts = urls;
        }
        if let Some(buffer) = overrides.time_buffer_ms {
            self.time_buffer_ms = buffer;
        }
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KEYRING_ZKPG_SERVER_TIME_ENDPOINT`
    /// - `KEYRING_ZKPG_ZKEY_URL`
    /// - `KEYRING_ZKPG_WASM_URL`
    /// - `KEYRING_ZKPG_SYMBOL_MAP_URL`
    /// - `KEYRING_ZKPG_TIME_BUFFER_MS` (default: 6000)
    ///
    /// Unset variables keep the production defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let url = |var: &str, default: String| -> Result<String, ConfigError> {
            let raw = lookup(var).unwrap_or(default);
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
            Ok(raw)
        };
        let time_buffer_ms = match lookup("KEYRING_ZKPG_TIME_BUFFER_MS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidNumber("KEYRING_ZKPG_TIME_BUFFER_MS".to_string(), raw.clone())
            })?,
            None => defaults.time_buffer_ms,
        };
        Ok(Self {
            server_time_endpoint: url(
                "KEYRING_ZKPG_SERVER_TIME_ENDPOINT",
                defaults.server_time_endpoint,
            )?,
            zk_artifacts: ArtifactUrls {
                z_key: url("KEYRING_ZKPG_ZKEY_URL", defaults.zk_artifacts.z_key)?,
                wasm: url("KEYRING_ZKPG_WASM_URL", defaults.zk_artifacts.wasm)?,
                symbol_map: url("KEYRING_ZKPG_SYMBOL_MAP_URL", defaults.zk_artifacts.symbol_map)?,
            },
            time_buffer_ms,
        })
    }

    /// Configuration pointing every endpoint at a local mock server.
    pub fn local_mock(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            server_time_endpoint: format!("{base}/api/v1/policies/public"),
            zk_artifacts: ArtifactUrls {
                z_key: format!("{base}/AuthorisationConstruction.01.zKey"),
                wasm: format!("{base}/AuthorisationConstruction.wasm"),
                symbol_map: format!("{base}/AuthorisationConstruction.public.sym.json"),
            },
            time_buffer_ms: DEFAULT_TIME_BUFFER_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_production() {
        let cfg = KeyringZkpgConfig::default();
        assert_eq!(cfg.time_buffer_ms, 6000);
        assert_eq!(
            cfg.zk_artifacts.z_key,
            concat!(
                "https://main.cdn.krnprod.net/AuthorisationConstruction/",
                "AuthorisationConstruction.01.zKey"
            )
        );
        assert!(cfg.server_time_endpoint.ends_with("/api/v1/policies/public"));
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let cfg = KeyringZkpgConfig::default().with_overrides(KeyringZkpgConfigOverrides {
            time_buffer_ms: Some(0),
            ..Default::default()
        });
        assert_eq!(cfg.time_buffer_ms, 0);
        assert_eq!(cfg.server_time_endpoint, DEFAULT_SERVER_TIME_ENDPOINT);
    }

    #[test]
    fn lookup_reads_and_validates() {
        let vars: HashMap<&str, &str> = [
            ("KEYRING_ZKPG_WASM_URL", "http://127.0.0.1:9000/c.wasm"),
            ("KEYRING_ZKPG_TIME_BUFFER_MS", "250"),
        ]
        .into_iter()
        .collect();
        let cfg = KeyringZkpgConfig::from_lookup(|v| vars.get(v).map(|s| s.to_string())).unwrap();
        assert_eq!(cfg.zk_artifacts.wasm, "http://127.0.0.1:9000/c.wasm");
        assert_eq!(cfg.time_buffer_ms, 250);
        assert_eq!(cfg.zk_artifacts.z_key, ArtifactUrls::default().z_key);
    }

    #[test]
    fn lookup_rejects_bad_values() {
        let bad_url = KeyringZkpgConfig::from_lookup(|v| {
            (v == "KEYRING_ZKPG_ZKEY_URL").then(|| "not a url".to_string())
        });
        assert!(matches!(bad_url, Err(ConfigError::InvalidUrl(..))));

        let bad_num = KeyringZkpgConfig::from_lookup(|v| {
            (v == "KEYRING_ZKPG_TIME_BUFFER_MS").then(|| "soon".to_string())
        });
        assert!(matches!(bad_num, Err(ConfigError::InvalidNumber(..))));
    }

    #[test]
    fn local_mock_uses_base() {
        let cfg = KeyringZkpgConfig::local_mock("http://127.0.0.1:4000/");
        assert_eq!(
            cfg.zk_artifacts.wasm,
            "http://127.0.0.1:4000/AuthorisationConstruction.wasm"
        );
    }
}
