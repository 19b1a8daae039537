//! # Proving Backends
//!
//! Abstract interface for the Groth16 `fullProve` step: witness
//! calculation followed by proof generation.
//!
//! ## Implementations
//!
//! - [`SnarkjsBackend`]: runs the `snarkjs` CLI in a scratch directory.
//! - `MockProvingBackend` (feature `mock`): deterministic SHA-256
//!   pseudo-proofs for development and tests. **Not zero-knowledge.**
//!
//! ## Security Invariant
//!
//! The trait requires `Send + Sync` so one backend can serve concurrent
//! proof requests. Backends hold no per-request state.

use async_trait::async_trait;

use crate::circuit::{CircuitSetup, FullProveOutput, WitnessInputs};
use crate::error::ProvingError;

#[cfg(feature = "mock")]
pub mod mock;
pub mod snarkjs;

#[cfg(feature = "mock")]
pub use mock::MockProvingBackend;
pub use snarkjs::SnarkjsBackend;

/// Computes a witness and Groth16 proof for the authorisation circuit.
#[async_trait]
pub trait ProvingBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Run witness calculation and proving.
    ///
    /// `Ok(None)` means the prover ran but produced no proof.
    async fn full_prove(
        &self,
        setup: &CircuitSetup,
        inputs: &WitnessInputs,
    ) -> Result<Option<FullProveOutput>, ProvingError>;
}
