//! # Authorisation Circuit Inputs and Outputs
//!
//! The authorisation circuit proves, without revealing the trapdoor, that
//!
//! 1. the regime encryptions encrypt `trapdoor·B` under the policy's
//!    regime keys, and
//! 2. the blinded message is the RSA blinding of the authorisation message
//!    digest, with the packed encryptions as its `backdoor` field.
//!
//! [`AuthorisationWitness`] holds every secret of one proof request. It is
//! consumed twice: once to build [`WitnessInputs`] for the prover and once
//! to unblind the issuer's signature. The digest and the input layout come
//! from the injected [`AuthorisationScheme`].
//!
//! ## Public Signals
//!
//! Inputs marked public are the circuit's public signals, in insertion
//! order. The orchestrator checks the blinded message signal against the
//! witness before returning a proof.

use std::sync::Arc;

use keyring_core::bigint::{decimal_to_hex, to_decimal};
use keyring_core::{EvmAddress, ValidationError};
use keyring_crypto::regime::pack;
use keyring_crypto::{
    BlindingFactor, CryptoError, EcCryptoSuite, PolicyRegimes, RegimeEncryption,
    RsaGroupElement, RsaPublicKey, Trapdoor,
};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::artifacts::ZkArtifacts;
use crate::scheme::{AuthMessage, AuthorisationScheme};

/// Proving material for one circuit.
#[derive(Debug, Clone)]
pub struct CircuitSetup {
    artifacts: Arc<ZkArtifacts>,
}

impl CircuitSetup {
    /// Wrap loaded artifacts.
    pub fn new(artifacts: Arc<ZkArtifacts>) -> Self {
        Self { artifacts }
    }

    /// Groth16 proving key.
    pub fn z_key(&self) -> &[u8] {
        &self.artifacts.z_key
    }

    /// Witness-calculator wasm.
    pub fn wasm(&self) -> &[u8] {
        &self.artifacts.wasm
    }

    /// Circuit symbol map.
    pub fn symbol_map(&self) -> &Value {
        &self.artifacts.symbol_map
    }

    /// Hex SHA-256 of the proving key. Identifies the circuit in logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.artifacts.z_key))
    }
}

fn decimal(value: &BigUint) -> Value {
    Value::String(to_decimal(value))
}

/// Named circuit inputs. Every scalar is a decimal string.
///
/// Serializes as the bare JSON object the witness calculator reads. The
/// public input names are kept alongside and are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WitnessInputs {
    values: Map<String, Value>,
    #[serde(skip)]
    public: Vec<String>,
}

impl WitnessInputs {
    /// Set a private scalar input.
    pub fn scalar(&mut self, name: &str, value: &BigUint) {
        self.values.insert(name.to_string(), decimal(value));
    }

    /// Set a scalar input that is also a public signal.
    ///
    /// Public signals follow the order of these calls.
    pub fn public_scalar(&mut self, name: &str, value: &BigUint) {
        self.scalar(name, value);
        if !self.public.iter().any(|n| n == name) {
            self.public.push(name.to_string());
        }
    }

    /// Set a one-dimensional array input.
    pub fn vector<'a>(&mut self, name: &str, values: impl IntoIterator<Item = &'a BigUint>) {
        let items = values.into_iter().map(decimal).collect();
        self.values.insert(name.to_string(), Value::Array(items));
    }

    /// Set a two-dimensional array input.
    pub fn matrix<'a, I>(&mut self, name: &str, rows: impl IntoIterator<Item = I>)
    where
        I: IntoIterator<Item = &'a BigUint>,
    {
        let rows = rows
            .into_iter()
            .map(|row| Value::Array(row.into_iter().map(decimal).collect()))
            .collect();
        self.values.insert(name.to_string(), Value::Array(rows));
    }

    /// Look up one input.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Input names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Public input names in signal order.
    pub fn public_names(&self) -> impl Iterator<Item = &str> {
        self.public.iter().map(String::as_str)
    }

    /// The inputs as a JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// The credential fields a witness is built for.
#[derive(Debug, Clone)]
pub struct WitnessRequest {
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
    /// Issuer key.
    pub key: RsaPublicKey,
    /// Regime slots of the policy.
    pub regimes: PolicyRegimes,
}

/// All secrets of one proof request.
///
/// Not `Clone`: the trapdoor and blinding factor must not outlive the
/// request that drew them.
pub struct AuthorisationWitness {
    message: AuthMessage,
    trapdoor: Trapdoor,
    regimes: PolicyRegimes,
    nonces: Vec<BigUint>,
    encryptions: Vec<RegimeEncryption>,
    blinding: BlindingFactor,
    digest: RsaGroupElement,
    blinded: RsaGroupElement,
}

impl std::fmt::Debug for AuthorisationWitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorisationWitness")
            .field("message", &self.message)
            .field("blinded", &self.blinded)
            .finish_non_exhaustive()
    }
}

impl AuthorisationWitness {
    /// Draw a trapdoor, nonces and a blinding factor for `request`.
    pub fn build<R: RngCore + CryptoRng>(
        suite: &dyn EcCryptoSuite,
        scheme: &dyn AuthorisationScheme,
        request: WitnessRequest,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let trapdoor = Trapdoor::random(rng);
        let nonces = request.regimes.draw_nonces(suite, rng);
        let blinding = BlindingFactor::random(&request.key, rng);
        Self::assemble(suite, scheme, request, trapdoor, nonces, blinding)
    }

    /// Build from explicit randomness.
    pub fn assemble(
        suite: &dyn EcCryptoSuite,
        scheme: &dyn AuthorisationScheme,
        request: WitnessRequest,
        trapdoor: Trapdoor,
        nonces: Vec<BigUint>,
        blinding: BlindingFactor,
    ) -> Result<Self, CryptoError> {
        let encryptions =
            request
                .regimes
                .encrypt_with_nonces(suite, &trapdoor.scalar(suite), &nonces)?;
        let message = AuthMessage {
            trader: request.trader,
            policy_id: request.policy_id,
            chain_id: request.chain_id,
            valid_until: request.valid_until,
            cost: request.cost,
            key: request.key,
            backdoor: pack(&encryptions)?,
        };
        let digest = scheme.message_digest(&message);
        let blinded = message.key.blind(&digest, &blinding);
        Ok(Self {
            message,
            trapdoor,
            regimes: request.regimes,
            nonces,
            encryptions,
            blinding,
            digest,
            blinded,
        })
    }

    /// The message the issuer signs.
    pub fn message(&self) -> &AuthMessage {
        &self.message
    }

    /// The trapdoor the regime encryptions carry.
    pub fn trapdoor(&self) -> &Trapdoor {
        &self.trapdoor
    }

    /// Regime slots the trapdoor is encrypted under.
    pub fn regimes(&self) -> &PolicyRegimes {
        &self.regimes
    }

    /// Encryption nonces in slot order. Zero for unused slots.
    pub fn nonces(&self) -> &[BigUint] {
        &self.nonces
    }

    /// Regime ciphertexts in slot order.
    pub fn encryptions(&self) -> &[RegimeEncryption] {
        &self.encryptions
    }

    /// Digest of [`Self::message`] under the scheme the witness was
    /// built with.
    pub fn digest(&self) -> &RsaGroupElement {
        &self.digest
    }

    /// The blinded digest sent to the issuer.
    pub fn blinded_message(&self) -> &RsaGroupElement {
        &self.blinded
    }

    /// Blinding factor used for [`Self::blinded_message`].
    pub fn blinding_factor(&self) -> &BlindingFactor {
        &self.blinding
    }
}

/// A Groth16 proof in snarkjs layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    /// `A` in G1, projective.
    pub pi_a: Vec<String>,
    /// `B` in G2, projective.
    pub pi_b: Vec<Vec<String>>,
    /// `C` in G1, projective.
    pub pi_c: Vec<String>,
    /// Always `groth16`.
    pub protocol: String,
    /// Pairing curve name.
    pub curve: String,
}

impl Groth16Proof {
    /// Re-encode every coordinate from decimal to `0x` hex.
    pub fn hexlify(&self) -> Result<Self, ValidationError> {
        let hex_all = |field: &str, values: &[String]| -> Result<Vec<String>, ValidationError> {
            values.iter().map(|v| decimal_to_hex(field, v)).collect()
        };
        Ok(Self {
            pi_a: hex_all("pi_a", &self.pi_a)?,
            pi_b: self
                .pi_b
                .iter()
                .map(|row| hex_all("pi_b", row))
                .collect::<Result<_, _>>()?,
            pi_c: hex_all("pi_c", &self.pi_c)?,
            protocol: self.protocol.clone(),
            curve: self.curve.clone(),
        })
    }
}

/// Raw prover result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullProveOutput {
    /// The proof, decimal coordinates.
    pub proof: Groth16Proof,
    /// Public signals, decimal strings.
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
}
