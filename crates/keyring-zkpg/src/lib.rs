#![deny(missing_docs)]

//! # keyring-zkpg -- Keyring Connect Proof Generation
//!
//! Orchestrates client-side generation of a Keyring Connect authorisation
//! proof and the calldata that turns it into an on-chain credential.
//!
//! ## Flow
//!
//! ```text
//! prefetch ──► artifacts (cache or CDN)
//!                  │
//! generate_proof ──┴─► witness ──► ProvingBackend::full_prove ──► proof
//!                                                                   │
//! issuer blind signature ──► create_credential_update_calldata ◄────┘
//! ```
//!
//! ## Modules
//!
//! - [`storage`]: versioned on-disk artifact cache with digest checks.
//! - [`artifacts`] / [`fetch`]: artifact download and single-flight fetch.
//! - [`status`]: explicit status state machine.
//! - [`circuit`]: witness construction and proof types.
//! - [`scheme`]: message digest and circuit input layout.
//! - [`backend`]: proving backends (snarkjs process, mock).
//! - [`clock`]: server time with local fallback.
//! - [`engine`]: the [`KeyringZkpg`] orchestrator.
//!
//! ## Crate Policy
//!
//! - The curve suite, authorisation scheme and proving backend are injected
//!   at construction. Nothing is patched into globals.
//! - The only process-wide state is the optional
//!   [`KeyringZkpg::get_instance`] slot.

pub mod artifacts;
pub mod backend;
pub mod circuit;
pub mod clock;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod scheme;
pub mod status;
pub mod storage;

pub use artifacts::{ArtifactSource, HttpArtifactSource, ZkArtifacts};
#[cfg(feature = "mock")]
pub use backend::MockProvingBackend;
pub use backend::{ProvingBackend, SnarkjsBackend};
pub use circuit::{
    AuthorisationWitness, CircuitSetup, FullProveOutput, Groth16Proof, WitnessInputs,
};
pub use clock::{HttpServerClock, LocalClock, ServerClock};
pub use engine::{KeyringZkpg, KeyringZkpgOptions, KeyringZkpgOutput};
pub use error::{ArtifactError, ProvingError, StatusError, StorageError, ZkpgError};
pub use fetch::ArtifactFetcher;
pub use scheme::{AuthMessage, AuthorisationScheme, ReferenceScheme};
pub use status::{StatusKind, StatusMachine, ZkpgStatus};
pub use storage::ArtifactStorage;
