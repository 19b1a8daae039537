//! End-to-end credential signing: regime encryption, blinding, issuer
//! signature, unblinding and verification.

use keyring_core::RegimeKeySchema;
use keyring_crypto::regime::pack;
use keyring_crypto::{
    BabyJubJub, BlindingFactor, CryptoError, EcCryptoSuite, PolicyRegimes, RegimeKey,
    RsaPrivateKey, Trapdoor, N_REGIMES,
};
use num_bigint::BigUint;
use num_traits::One;
use rand::rngs::OsRng;

fn issuer() -> RsaPrivateKey {
    let p = BigUint::from((1u64 << 61) - 1);
    let q = (BigUint::one() << 89u32) - 1u32;
    RsaPrivateKey::from_primes(&p, &q, BigUint::from(65_537u32)).unwrap()
}

#[test]
fn issued_credential_verifies_after_unblinding() {
    let curve = BabyJubJub::new();
    let issuer = issuer();
    let key = issuer.public_key();

    let regime_secret = BigUint::from(77_777u32);
    let regime = RegimeKey(curve.mul_scalar(&curve.base_point(), &regime_secret).unwrap());
    let trapdoor = Trapdoor::random(&mut OsRng);
    let encryptions = PolicyRegimes::single(regime)
        .encrypt(&curve, &trapdoor.scalar(&curve), &mut OsRng)
        .unwrap();
    assert_eq!(encryptions.len(), N_REGIMES);

    let backdoor = pack(&encryptions).unwrap();
    let digest = key.reduce(&BigUint::from_bytes_be(&backdoor));
    let factor = BlindingFactor::random(key, &mut OsRng);

    let blinded_signature = issuer.sign(&key.blind(&digest, &factor));
    let signature = key.unblind_verified(&digest, &blinded_signature, &factor).unwrap();
    assert!(key.verify(&digest, &signature));

    assert_eq!(
        encryptions[0].decrypt(&curve, &regime_secret).unwrap(),
        curve
            .mul_scalar(&curve.base_point(), &trapdoor.scalar(&curve))
            .unwrap()
    );
}

#[test]
fn signature_for_another_message_is_rejected() {
    let issuer = issuer();
    let key = issuer.public_key();
    let ours = key.reduce(&BigUint::from(1_000u32));
    let theirs = key.reduce(&BigUint::from(1_001u32));
    let factor = BlindingFactor::random(key, &mut OsRng);

    let wrong = issuer.sign(&key.blind(&theirs, &factor));
    assert_eq!(
        key.unblind_verified(&ours, &wrong, &factor),
        Err(CryptoError::VerificationFailed)
    );
}

#[test]
fn off_curve_regime_keys_are_rejected() {
    let curve = BabyJubJub::new();
    let schema = RegimeKeySchema {
        x: "1".into(),
        y: "2".into(),
    };
    assert!(matches!(
        RegimeKey::from_schema(&schema, &curve),
        Err(CryptoError::InvalidPoint(_))
    ));
}

#[test]
fn base_point_is_a_usable_regime_key() {
    let curve = BabyJubJub::new();
    let base = curve.base_point();
    let schema = RegimeKeySchema {
        x: base.x.to_string(),
        y: base.y.to_string(),
    };
    let key = RegimeKey::from_schema(&schema, &curve).unwrap();
    let encs = PolicyRegimes::single(key)
        .encrypt(&curve, &BigUint::from(5u8), &mut OsRng)
        .unwrap();
    assert_eq!(pack(&encs).unwrap().len(), N_REGIMES * 128);
    // With secret 1, decryption yields 5·B.
    assert_eq!(
        encs[0].decrypt(&curve, &BigUint::one()).unwrap(),
        curve.mul_scalar(&base, &BigUint::from(5u8)).unwrap()
    );
}
