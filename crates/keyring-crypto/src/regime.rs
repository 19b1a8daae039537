//! # Regime Encryptions
//!
//! A policy carries up to [`N_REGIMES`] regime keys. The credential
//! trapdoor is ElGamal-encrypted under each one:
//!
//! ```text
//! c1 = r·B
//! c2 = t·B + r·K
//! ```
//!
//! where `B` is the suite base point, `t` the trapdoor, `K` the regime key
//! and `r` a fresh nonce. A regime holder with secret `k` (`K = k·B`)
//! recovers `t·B = c2 - k·c1`.
//!
//! Only the first slot is populated today. The rest are zero keys, which
//! encrypt to all-zero ciphertexts so the circuit sees a fixed-width input.
//! Any other key must be a point of the suite's prime-order subgroup.

use keyring_core::bigint::to_padded_bytes;
use keyring_core::RegimeKeySchema;
use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::ec::{EcCryptoSuite, EcPoint};
use crate::error::CryptoError;

/// Number of regime slots in a policy.
pub const N_REGIMES: usize = 5;

/// Width of one packed coordinate.
pub const COORDINATE_BYTES: usize = 32;

/// A regime public key. The zero point marks an unused slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeKey(pub EcPoint);

impl RegimeKey {
    /// An unused slot.
    pub fn zero() -> Self {
        Self(EcPoint::zero())
    }

    /// Parse a key from its wire form.
    ///
    /// The all-zero pair is accepted as an unused slot. Anything else must
    /// lie in the suite's prime-order subgroup.
    pub fn from_schema(
        schema: &RegimeKeySchema,
        suite: &dyn EcCryptoSuite,
    ) -> Result<Self, CryptoError> {
        let (x, y) = schema.parse()?;
        let point = EcPoint::new(x, y);
        if !point.is_zero() && !suite.is_in_subgroup(&point) {
            return Err(CryptoError::InvalidPoint(format!(
                "regime key ({}, {}) is not in the {} subgroup",
                schema.x,
                schema.y,
                suite.name()
            )));
        }
        Ok(Self(point))
    }

    /// Whether this slot is unused.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// The fixed-width regime slots of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRegimes {
    keys: Vec<RegimeKey>,
}

impl PolicyRegimes {
    /// One active regime followed by zero-key padding.
    pub fn single(active: RegimeKey) -> Self {
        let mut keys = Vec::with_capacity(N_REGIMES);
        keys.push(active);
        keys.resize(N_REGIMES, RegimeKey::zero());
        Self { keys }
    }

    /// Regime keys in slot order.
    pub fn keys(&self) -> &[RegimeKey] {
        &self.keys
    }

    /// Draw one nonce per slot. Unused slots get zero.
    pub fn draw_nonces<R: RngCore + CryptoRng>(
        &self,
        suite: &dyn EcCryptoSuite,
        rng: &mut R,
    ) -> Vec<BigUint> {
        self.keys
            .iter()
            .map(|key| {
                if key.is_zero() {
                    BigUint::zero()
                } else {
                    rng.gen_biguint_below(suite.subgroup_order())
                }
            })
            .collect()
    }

    /// Encrypt `trapdoor·B` under every slot with fresh nonces.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        suite: &dyn EcCryptoSuite,
        trapdoor: &BigUint,
        rng: &mut R,
    ) -> Result<Vec<RegimeEncryption>, CryptoError> {
        let nonces = self.draw_nonces(suite, rng);
        self.encrypt_with_nonces(suite, trapdoor, &nonces)
    }

    /// Encrypt `trapdoor·B` under every slot with the given nonces.
    ///
    /// Slots without a nonce are treated as unused.
    pub fn encrypt_with_nonces(
        &self,
        suite: &dyn EcCryptoSuite,
        trapdoor: &BigUint,
        nonces: &[BigUint],
    ) -> Result<Vec<RegimeEncryption>, CryptoError> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| match nonces.get(i) {
                Some(nonce) if !key.is_zero() => {
                    RegimeEncryption::encrypt(suite, key, trapdoor, nonce)
                }
                _ => Ok(RegimeEncryption::zero()),
            })
            .collect()
    }
}

/// One ElGamal ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeEncryption {
    /// `r·B`.
    pub c1: EcPoint,
    /// `t·B + r·K`.
    pub c2: EcPoint,
}

impl RegimeEncryption {
    /// Ciphertext of an unused slot.
    pub fn zero() -> Self {
        Self {
            c1: EcPoint::zero(),
            c2: EcPoint::zero(),
        }
    }

    /// Encrypt `trapdoor·B` under `key` with an explicit nonce.
    pub fn encrypt(
        suite: &dyn EcCryptoSuite,
        key: &RegimeKey,
        trapdoor: &BigUint,
        nonce: &BigUint,
    ) -> Result<Self, CryptoError> {
        let base = suite.base_point();
        let c1 = suite.mul_scalar(&base, nonce)?;
        let shared = suite.mul_scalar(&key.0, nonce)?;
        let c2 = suite.add(&suite.mul_scalar(&base, trapdoor)?, &shared)?;
        Ok(Self { c1, c2 })
    }

    /// Recover `t·B` with the regime secret.
    pub fn decrypt(
        &self,
        suite: &dyn EcCryptoSuite,
        secret: &BigUint,
    ) -> Result<EcPoint, CryptoError> {
        let shared = suite.mul_scalar(&self.c1, secret)?;
        suite.add(&self.c2, &suite.neg(&shared)?)
    }

    /// The four coordinates in circuit order: `c1.x, c1.y, c2.x, c2.y`.
    pub fn coordinates(&self) -> [&BigUint; 4] {
        [&self.c1.x, &self.c1.y, &self.c2.x, &self.c2.y]
    }
}

/// Concatenate every coordinate as 32-byte big-endian words.
pub fn pack(encryptions: &[RegimeEncryption]) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(encryptions.len() * 4 * COORDINATE_BYTES);
    for enc in encryptions {
        for coord in enc.coordinates() {
            out.extend(to_padded_bytes("regime coordinate", coord, COORDINATE_BYTES)?);
        }
    }
    Ok(out)
}
