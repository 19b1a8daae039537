//! # Mock Proving Backend
//!
//! A deterministic, transparent prover for development and testing. Proof
//! coordinates are SHA-256 digests of the circuit fingerprint and the
//! canonical witness inputs.
//!
//! ## How It Works
//!
//! ```text
//! coord_i = SHA256( fingerprint || canonical(inputs) || i ) with the top 3 bits cleared
//! ```
//!
//! Clearing the top bits keeps every coordinate below the BN254 base field
//! modulus, so the output has the same shape as a real snarkjs proof.
//!
//! Public signals are the inputs the authorisation scheme marked public,
//! read back in signal order.
//!
//! ## Security Warning
//!
//! **NOT PRIVATE.** Anyone can recompute the proof from the inputs.

use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::ProvingBackend;
use crate::circuit::{CircuitSetup, FullProveOutput, Groth16Proof, WitnessInputs};
use crate::error::ProvingError;

/// Deterministic SHA-256 prover.
#[derive(Debug, Clone, Default)]
pub struct MockProvingBackend {
    empty: bool,
}

impl MockProvingBackend {
    /// Prover producing proofs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prover that runs but never yields a proof.
    pub fn empty() -> Self {
        Self { empty: true }
    }

    fn coordinate(seed: &[u8], index: u8) -> String {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update([index]);
        let mut digest: [u8; 32] = hasher.finalize().into();
        digest[0] &= 0x1f;
        BigUint::from_bytes_be(&digest).to_string()
    }
}

#[async_trait]
impl ProvingBackend for MockProvingBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn full_prove(
        &self,
        setup: &CircuitSetup,
        inputs: &WitnessInputs,
    ) -> Result<Option<FullProveOutput>, ProvingError> {
        let public_signals = inputs
            .public_names()
            .map(|name| match inputs.get(name) {
                Some(Value::String(v)) => Ok(v.clone()),
                _ => Err(ProvingError::Witness(format!("missing scalar input {name}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if public_signals.is_empty() {
            return Err(ProvingError::Witness("no public inputs".into()));
        }

        if self.empty {
            return Ok(None);
        }

        // serde_json maps are sorted, so this is canonical.
        let canonical = serde_json::to_vec(inputs.as_map())
            .map_err(|e| ProvingError::Witness(format!("failed to serialize inputs: {e}")))?;
        let mut seed = setup.fingerprint().into_bytes();
        seed.extend_from_slice(&canonical);

        let c = |i| Self::coordinate(&seed, i);
        let proof = Groth16Proof {
            pi_a: vec![c(0), c(1), "1".into()],
            pi_b: vec![vec![c(2), c(3)], vec![c(4), c(5)], vec!["1".into(), "0".into()]],
            pi_c: vec![c(6), c(7), "1".into()],
            protocol: "groth16".into(),
            curve: "bn128".into(),
        };
        tracing::debug!(backend = self.name(), "mock proof generated");
        Ok(Some(FullProveOutput {
            proof,
            public_signals,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ZkArtifacts;
    use std::sync::Arc;

    fn setup(z_key: &[u8]) -> CircuitSetup {
        CircuitSetup::new(Arc::new(ZkArtifacts {
            z_key: z_key.to_vec(),
            wasm: b"wasm".to_vec(),
            symbol_map: serde_json::json!({}),
        }))
    }

    fn inputs(blinded: u64) -> WitnessInputs {
        let mut inputs = WitnessInputs::default();
        inputs.public_scalar("blindedMessage", &blinded.into());
        inputs.public_scalar("trader", &170u64.into());
        inputs.public_scalar("policyId", &7u64.into());
        inputs.scalar("trapdoor", &42u64.into());
        inputs
    }

    #[tokio::test]
    async fn proof_is_deterministic_and_bound_to_inputs() {
        let backend = MockProvingBackend::new();
        let prove = |z_key: &'static [u8], blinded| {
            let backend = backend.clone();
            async move {
                backend
                    .full_prove(&setup(z_key), &inputs(blinded))
                    .await
                    .unwrap()
                    .unwrap()
            }
        };
        let a = prove(b"zk", 5).await;
        let b = prove(b"zk", 5).await;
        let c = prove(b"zk", 6).await;
        let d = prove(b"other", 5).await;
        assert_eq!(a, b);
        assert_ne!(a.proof, c.proof);
        assert_ne!(a.proof, d.proof);
        assert_eq!(a.public_signals, vec!["5", "170", "7"]);
    }

    #[tokio::test]
    async fn coordinates_fit_the_field() {
        let out = MockProvingBackend::new()
            .full_prove(&setup(b"zk"), &inputs(5))
            .await
            .unwrap()
            .unwrap();
        let bound = BigUint::from(1u8) << 253;
        for coord in out.proof.pi_a.iter().chain(out.proof.pi_c.iter()) {
            assert!(coord.parse::<BigUint>().unwrap() < bound);
        }
    }

    #[tokio::test]
    async fn inputs_without_public_signals_are_a_witness_error() {
        // Deserialized inputs carry no public markers.
        let bare: WitnessInputs =
            serde_json::from_value(serde_json::json!({"trader": "1"})).unwrap();
        let err = MockProvingBackend::new()
            .full_prove(&setup(b"zk"), &bare)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvingError::Witness(_)));
    }

    #[tokio::test]
    async fn empty_mode_yields_nothing() {
        let out = MockProvingBackend::empty()
            .full_prove(&setup(b"zk"), &inputs(5))
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
