//! # Credential Trapdoor
//!
//! The random secret a credential is bound to. Regime holders can recover
//! `trapdoor·B` from the regime encryptions; nobody else learns it.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::ec::EcCryptoSuite;

/// Random secret linking a credential to its regime encryptions.
///
/// The raw bytes are zeroized on drop.
pub struct Trapdoor(Zeroizing<[u8; 32]>);

impl Trapdoor {
    /// Draw a fresh trapdoor.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    /// Trapdoor from fixed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// The trapdoor as a scalar of the suite's subgroup.
    pub fn scalar(&self, suite: &dyn EcCryptoSuite) -> BigUint {
        BigUint::from_bytes_be(&self.0[..]) % suite.subgroup_order()
    }
}

impl std::fmt::Debug for Trapdoor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Trapdoor([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::BabyJubJub;
    use rand::rngs::OsRng;

    #[test]
    fn scalar_is_below_subgroup_order() {
        let curve = BabyJubJub::new();
        let t = Trapdoor::from_bytes([0xff; 32]);
        assert!(&t.scalar(&curve) < curve.subgroup_order());
        assert_eq!(
            Trapdoor::from_bytes([0; 32]).scalar(&curve),
            BigUint::from(0u8)
        );
    }

    #[test]
    fn debug_redacts_the_secret() {
        let r = Trapdoor::random(&mut OsRng);
        assert!(format!("{r:?}").contains("REDACTED"));
    }
}
