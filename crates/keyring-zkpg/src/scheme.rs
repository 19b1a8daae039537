//! # Authorisation Scheme
//!
//! Two things must agree with the circuit the proving artifacts were built
//! from: the integer the issuer blindly signs for a credential tuple, and
//! the named inputs the prover is fed. Both live behind
//! [`AuthorisationScheme`], injected into the orchestrator next to the
//! curve suite and the proving backend.
//!
//! ## Reference Scheme
//!
//! [`ReferenceScheme`] is the default and a **development placeholder**.
//! Its digest is SHA-256 over a domain tag and the credential fields, and
//! its input names are its own. It does not interoperate with the
//! production AuthorisationConstruction circuit or the production issuer:
//! proofs and signatures built with it only check out against the mock
//! backend and local issuers using the same encoding. Talking to the live
//! backend requires a scheme that reproduces the production circuit.

use keyring_core::EvmAddress;
use keyring_crypto::{EcCryptoSuite, RegimeEncryption, RsaGroupElement, RsaPublicKey};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::circuit::{AuthorisationWitness, WitnessInputs};

/// The credential tuple signed by the issuer.
///
/// Its fields are the calldata fields minus the signature, so a verifier
/// holding the calldata can recompute the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMessage {
    /// Credential holder.
    pub trader: EvmAddress,
    /// On-chain policy identifier.
    pub policy_id: u64,
    /// Target chain.
    pub chain_id: u64,
    /// Expiry, unix seconds.
    pub valid_until: u64,
    /// Credential fee.
    pub cost: u64,
    /// Issuer key the credential is bound to.
    pub key: RsaPublicKey,
    /// Packed regime encryptions.
    pub backdoor: Vec<u8>,
}

/// Message digest and circuit input layout of one authorisation circuit.
pub trait AuthorisationScheme: Send + Sync + std::fmt::Debug {
    /// Short scheme name for logs.
    fn name(&self) -> &'static str;

    /// The group element the issuer signs for `message`.
    fn message_digest(&self, message: &AuthMessage) -> RsaGroupElement;

    /// Named prover inputs for `witness`, with the public ones marked.
    fn circuit_inputs(
        &self,
        witness: &AuthorisationWitness,
        suite: &dyn EcCryptoSuite,
    ) -> WitnessInputs;

    /// Index of the blinded message among the public signals.
    fn blinded_message_signal(&self) -> usize;
}

/// Development encoding. See the module docs before relying on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceScheme;

impl ReferenceScheme {
    /// Domain separation tag for the message digest.
    pub const DOMAIN: &'static [u8] = b"keyring.authorisation-message.v1";

    /// Canonical byte encoding hashed by the digest.
    ///
    /// Domain tag, then the fields in calldata order. Integers are
    /// big-endian; variable-length byte strings carry a `u32` big-endian
    /// length prefix.
    pub fn encode(message: &AuthMessage) -> Vec<u8> {
        let modulus = message.key.modulus().to_bytes_be();
        let mut out = Vec::with_capacity(
            Self::DOMAIN.len() + 20 + 4 * 8 + 8 + modulus.len() + message.backdoor.len(),
        );
        out.extend_from_slice(Self::DOMAIN);
        out.extend_from_slice(&message.trader.to_bytes());
        out.extend_from_slice(&message.policy_id.to_be_bytes());
        out.extend_from_slice(&message.chain_id.to_be_bytes());
        out.extend_from_slice(&message.valid_until.to_be_bytes());
        out.extend_from_slice(&message.cost.to_be_bytes());
        for field in [&modulus, &message.backdoor] {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field);
        }
        out
    }
}

impl AuthorisationScheme for ReferenceScheme {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn message_digest(&self, message: &AuthMessage) -> RsaGroupElement {
        let hash = Sha256::digest(Self::encode(message));
        message.key.reduce(&BigUint::from_bytes_be(&hash))
    }

    fn circuit_inputs(
        &self,
        witness: &AuthorisationWitness,
        suite: &dyn EcCryptoSuite,
    ) -> WitnessInputs {
        let m = witness.message();
        let mut inputs = WitnessInputs::default();
        inputs.public_scalar("blindedMessage", witness.blinded_message().value());
        inputs.public_scalar("trader", &BigUint::from_bytes_be(&m.trader.to_bytes()));
        inputs.public_scalar("policyId", &m.policy_id.into());
        inputs.public_scalar("chainId", &m.chain_id.into());
        inputs.public_scalar("validUntil", &m.valid_until.into());
        inputs.public_scalar("cost", &m.cost.into());
        inputs.scalar("rsaModulus", m.key.modulus());
        inputs.scalar("rsaExponent", m.key.exponent());
        inputs.scalar("blindingFactor", witness.blinding_factor().value());
        inputs.scalar("trapdoor", &witness.trapdoor().scalar(suite));
        let keys = witness.regimes().keys().iter().map(|k| [&k.0.x, &k.0.y]);
        inputs.matrix("regimeKeys", keys);
        inputs.vector("regimeNonces", witness.nonces());
        let encryptions = witness
            .encryptions()
            .iter()
            .map(RegimeEncryption::coordinates);
        inputs.matrix("regimeEncryptions", encryptions);
        inputs
    }

    fn blinded_message_signal(&self) -> usize {
        0
    }
}
