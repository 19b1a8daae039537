//! # RSA Blind Signatures
//!
//! The issuer signs the authorisation digest without seeing it:
//!
//! 1. The requester draws a blinding factor `r` coprime to `n` and sends
//!    `m' = m · r^e mod n`.
//! 2. The issuer returns `s' = m'^d mod n`.
//! 3. The requester unblinds `s = s' · r⁻¹ mod n` and checks
//!    `s^e ≡ m (mod n)`.
//!
//! Verification in step 3 is mandatory. A signature that fails it is never
//! turned into calldata.

use keyring_core::bigint::{bytes_to_hex, to_padded_bytes};
use keyring_core::PublicKeySchema;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// The issuer's RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl RsaPublicKey {
    /// Validate and construct a key. Requires `n > 3` and `1 < e < n`.
    pub fn new(modulus: BigUint, exponent: BigUint) -> Result<Self, CryptoError> {
        if modulus <= BigUint::from(3u8) {
            return Err(CryptoError::InvalidKey("modulus too small".into()));
        }
        if exponent <= BigUint::one() || exponent >= modulus {
            return Err(CryptoError::InvalidKey("exponent out of range".into()));
        }
        Ok(Self { modulus, exponent })
    }

    /// Parse the decimal wire form.
    pub fn from_schema(schema: &PublicKeySchema) -> Result<Self, CryptoError> {
        let (n, e) = schema.parse()?;
        Self::new(n, e)
    }

    /// Modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Public exponent `e`.
    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    /// Byte length of the modulus.
    pub fn byte_len(&self) -> usize {
        self.modulus.bits().div_ceil(8) as usize
    }

    /// `0x` hex of the modulus, as written into calldata `key`.
    pub fn modulus_hex(&self) -> String {
        bytes_to_hex(&self.modulus.to_bytes_be())
    }

    /// Wrap a value as a group element, rejecting unreduced input.
    pub fn element(&self, value: BigUint) -> Result<RsaGroupElement, CryptoError> {
        if value >= self.modulus {
            return Err(CryptoError::OutOfRange);
        }
        Ok(RsaGroupElement(value))
    }

    /// Reduce an arbitrary integer into the group.
    pub fn reduce(&self, value: &BigUint) -> RsaGroupElement {
        RsaGroupElement(value % &self.modulus)
    }

    /// Blind a message digest: `m · r^e mod n`.
    pub fn blind(&self, message: &RsaGroupElement, factor: &BlindingFactor) -> RsaGroupElement {
        let masked = factor.r.modpow(&self.exponent, &self.modulus);
        RsaGroupElement((&message.0 * masked) % &self.modulus)
    }

    /// Unblind an issuer signature: `s' · r⁻¹ mod n`.
    pub fn unblind(&self, blinded: &RsaGroupElement, factor: &BlindingFactor) -> RsaGroupElement {
        RsaGroupElement((&blinded.0 * &factor.r_inv) % &self.modulus)
    }

    /// Check `s^e ≡ m (mod n)`.
    pub fn verify(&self, message: &RsaGroupElement, signature: &RsaGroupElement) -> bool {
        signature.0.modpow(&self.exponent, &self.modulus) == message.0
    }

    /// Unblind then verify, failing with [`CryptoError::VerificationFailed`].
    pub fn unblind_verified(
        &self,
        message: &RsaGroupElement,
        blinded_signature: &RsaGroupElement,
        factor: &BlindingFactor,
    ) -> Result<RsaGroupElement, CryptoError> {
        let signature = self.unblind(blinded_signature, factor);
        if self.verify(message, &signature) {
            Ok(signature)
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }
}

/// An element of `Z/nZ`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaGroupElement(BigUint);

impl RsaGroupElement {
    /// Integer value.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// `0x` hex left-padded to the modulus width.
    pub fn to_padded_hex(&self, key: &RsaPublicKey) -> Result<String, CryptoError> {
        Ok(bytes_to_hex(&to_padded_bytes("rsa element", &self.0, key.byte_len())?))
    }
}

/// A blinding factor `r` and its inverse modulo `n`.
///
/// Cleared on drop; never serialized.
pub struct BlindingFactor {
    r: BigUint,
    r_inv: BigUint,
}

impl BlindingFactor {
    /// Draw a random factor in `[2, n)` that is invertible modulo `n`.
    pub fn random<R: RngCore + CryptoRng>(key: &RsaPublicKey, rng: &mut R) -> Self {
        let two = BigUint::from(2u8);
        loop {
            let r = rng.gen_biguint_range(&two, &key.modulus);
            if let Some(r_inv) = r.modinv(&key.modulus) {
                return Self { r, r_inv };
            }
        }
    }

    /// Factor from an explicit value.
    pub fn from_value(r: BigUint, key: &RsaPublicKey) -> Result<Self, CryptoError> {
        if r.is_zero() || r >= key.modulus {
            return Err(CryptoError::OutOfRange);
        }
        let r_inv = r.modinv(&key.modulus).ok_or(CryptoError::NotInvertible)?;
        Ok(Self { r, r_inv })
    }

    /// The factor itself, for the circuit witness.
    pub fn value(&self) -> &BigUint {
        &self.r
    }
}

impl std::fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindingFactor([REDACTED])")
    }
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.r.set_zero();
        self.r_inv.set_zero();
    }
}

/// Issuer-side RSA key. Used by local issuers and test doubles.
pub struct RsaPrivateKey {
    public: RsaPublicKey,
    d: BigUint,
}

impl RsaPrivateKey {
    /// Derive a key from two distinct primes and a public exponent.
    pub fn from_primes(p: &BigUint, q: &BigUint, e: BigUint) -> Result<Self, CryptoError> {
        if p == q {
            return Err(CryptoError::InvalidKey("primes must be distinct".into()));
        }
        if p <= &BigUint::one() || q <= &BigUint::one() {
            return Err(CryptoError::InvalidKey("primes must exceed one".into()));
        }
        let n = p * q;
        let phi = (p - 1u32) * (q - 1u32);
        let d = e.modinv(&phi).ok_or(CryptoError::NotInvertible)?;
        Ok(Self {
            public: RsaPublicKey::new(n, e)?,
            d,
        })
    }

    /// Public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Raw RSA signature `m^d mod n`.
    pub fn sign(&self, message: &RsaGroupElement) -> RsaGroupElement {
        RsaGroupElement(message.0.modpow(&self.d, &self.public.modulus))
    }
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("public", &self.public)
            .field("d", &"[REDACTED]")
            .finish()
    }
}
