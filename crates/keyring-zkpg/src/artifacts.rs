//! # Proving Artifacts
//!
//! The authorisation circuit needs three files: the Groth16 proving key,
//! the witness-calculator wasm, and the circuit symbol map. They are
//! fetched once from the CDN and cached.
//!
//! [`ArtifactSource`] is the download seam. [`HttpArtifactSource`] is the
//! reqwest implementation; tests substitute a `wiremock` server behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// The three proving artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkArtifacts {
    /// Groth16 proving key.
    pub z_key: Vec<u8>,
    /// Witness-calculator wasm.
    pub wasm: Vec<u8>,
    /// Circuit symbol map.
    pub symbol_map: serde_json::Value,
}

impl ZkArtifacts {
    /// Total size of the binary artifacts.
    pub fn byte_len(&self) -> usize {
        self.z_key.len() + self.wasm.len()
    }
}

/// Where artifacts are downloaded from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Download a binary file.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ArtifactError>;

    /// Download and parse a JSON file.
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ArtifactError>;
}

/// Artifact downloads over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpArtifactSource {
    client: reqwest::Client,
}

impl HttpArtifactSource {
    /// Source using a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source sharing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ArtifactError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArtifactError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!(url, status = status.as_u16(), "artifact download failed");
            return Err(ArtifactError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| ArtifactError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(url, bytes = bytes.len(), "artifact downloaded");
        Ok(bytes.to_vec())
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ArtifactError> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
