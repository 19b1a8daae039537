//! # Error Types
//!
//! One enum per concern. Artifact errors are `Clone` because a single
//! failed fetch is observed by every caller sharing it.

use std::path::PathBuf;

use keyring_core::ValidationError;
use keyring_crypto::CryptoError;
use thiserror::Error;

use crate::status::StatusKind;

/// Failures of the persistent artifact cache.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Stored bundle does not match its manifest.
    #[error("cached artifact {file} is corrupt: {reason}")]
    Corrupt {
        /// File within the bundle.
        file: String,
        /// What failed to match.
        reason: String,
    },

    /// Manifest or symbol map could not be (de)serialized.
    #[error("artifact manifest serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while loading proving artifacts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// The fetch was aborted by `cleanup()`.
    #[error("artifact fetch cancelled")]
    Cancelled,

    /// Transport failure.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// Artifact URL.
        url: String,
        /// Transport error text.
        reason: String,
    },

    /// Non-2xx response.
    #[error("fetching {url} returned HTTP {status}")]
    Status {
        /// Artifact URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Symbol map is not JSON.
    #[error("artifact at {url} is not valid JSON: {reason}")]
    Decode {
        /// Artifact URL.
        url: String,
        /// Parser error text.
        reason: String,
    },
}

/// Rejected status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The transition is not in the table.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: StatusKind,
        /// Attempted status.
        to: StatusKind,
    },
}

/// Failures of the proving backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvingError {
    /// Witness inputs were rejected.
    #[error("witness error: {0}")]
    Witness(String),

    /// The prover failed.
    #[error("prover error: {0}")]
    Prover(String),

    /// The prover produced output that could not be parsed.
    #[error("malformed prover output: {0}")]
    Output(String),
}

/// Errors surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum ZkpgError {
    /// Malformed request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Key material or signature arithmetic failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Proving artifacts could not be loaded.
    #[error("failed to load ZK artifacts: {0}")]
    Artifacts(#[from] ArtifactError),

    /// The proving backend failed.
    #[error(transparent)]
    Proving(#[from] ProvingError),

    /// The proving backend returned nothing.
    #[error("failed to generate circuit proof")]
    EmptyProof,

    /// The policy has no cost for the requested chain.
    #[error("policy {policy_id} does not support chain id {chain_id}")]
    UnsupportedChain {
        /// Policy identifier.
        policy_id: u64,
        /// Requested chain.
        chain_id: u64,
    },

    /// The proof output was produced for a different request.
    #[error("proof output does not belong to this input: {0}")]
    OutputMismatch(String),

    /// The unblinded signature does not verify.
    #[error("Invalid blinded signature")]
    InvalidBlindedSignature,

    /// Operation not allowed in the current status.
    #[error(transparent)]
    Status(#[from] StatusError),
}
