//! # Elliptic-Curve Suite
//!
//! The orchestrator never links a curve implementation directly. It is
//! handed an [`EcCryptoSuite`] at construction, and every regime encryption
//! goes through that value.
//!
//! [`BabyJubJub`] is the default suite: the twisted Edwards curve
//! `168700·x² + y² = 1 + 168696·x²·y²` over the BN254 scalar field, in the
//! coordinates the authorisation circuit uses. The group law comes from
//! `ark-ed-on-bn254`, which models the same curve in reduced form
//! (`a = 1`). The two are related by `x_reduced = √168700 · x`, applied at
//! the suite boundary.
//!
//! Every operation validates its input points. Coordinates outside the
//! field or off the curve fail with [`CryptoError::InvalidPoint`].

use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, Fq, Fr};
use ark_ff::{BigInteger, Field, PrimeField};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// An affine curve point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EcPoint {
    /// x coordinate.
    pub x: BigUint,
    /// y coordinate.
    pub y: BigUint,
}

impl EcPoint {
    /// Construct a point from coordinates without validation.
    pub fn new(x: BigUint, y: BigUint) -> Self {
        Self { x, y }
    }

    /// The all-zero pair. Not a curve point; marks a disabled regime.
    pub fn zero() -> Self {
        Self {
            x: BigUint::zero(),
            y: BigUint::zero(),
        }
    }

    /// Whether both coordinates are zero.
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }
}

/// Curve primitives required by regime encryption.
pub trait EcCryptoSuite: Send + Sync + std::fmt::Debug {
    /// Human-readable curve name.
    fn name(&self) -> &'static str;

    /// Prime order of the base field.
    fn field_modulus(&self) -> &BigUint;

    /// Generator of the prime-order subgroup.
    fn base_point(&self) -> EcPoint;

    /// Order of the subgroup generated by [`Self::base_point`].
    fn subgroup_order(&self) -> &BigUint;

    /// Group identity.
    fn identity(&self) -> EcPoint;

    /// Group law.
    fn add(&self, a: &EcPoint, b: &EcPoint) -> Result<EcPoint, CryptoError>;

    /// Group inverse.
    fn neg(&self, p: &EcPoint) -> Result<EcPoint, CryptoError>;

    /// Scalar multiplication `k·p`.
    fn mul_scalar(&self, p: &EcPoint, k: &BigUint) -> Result<EcPoint, CryptoError>;

    /// Whether `p` satisfies the curve equation with reduced coordinates.
    fn is_on_curve(&self, p: &EcPoint) -> bool;

    /// Whether `p` is on the curve and in the prime-order subgroup.
    fn is_in_subgroup(&self, p: &EcPoint) -> bool;
}

const BASE8_X: &str =
    "5299619240641551281634865583518297030282874472190772894086521144482721001553";
const BASE8_Y: &str =
    "16950150798460657717958625567821834550301663161624707787222815936182638968203";

/// Twisted Edwards `a` of the circuit coordinates.
const COEFF_A: u64 = 168_700;

fn constant(decimal: &str) -> BigUint {
    BigUint::parse_bytes(decimal.as_bytes(), 10).unwrap_or_default()
}

fn modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

fn to_biguint(f: Fq) -> BigUint {
    BigUint::from_bytes_le(&f.into_bigint().to_bytes_le())
}

/// The Baby Jubjub twisted Edwards curve.
#[derive(Debug, Clone)]
pub struct BabyJubJub {
    p: BigUint,
    sub_order: BigUint,
    base8: EcPoint,
    /// `√a` and its inverse; maps circuit x to reduced x and back.
    scale: Option<(Fq, Fq)>,
}

impl Default for BabyJubJub {
    fn default() -> Self {
        Self::new()
    }
}

impl BabyJubJub {
    /// Curve with the standard parameters.
    pub fn new() -> Self {
        let scale = Fq::from(COEFF_A)
            .sqrt()
            .and_then(|s| s.inverse().map(|inv| (s, inv)));
        Self {
            p: modulus::<Fq>(),
            sub_order: modulus::<Fr>(),
            base8: EcPoint::new(constant(BASE8_X), constant(BASE8_Y)),
            scale,
        }
    }

    fn scale(&self) -> Result<(Fq, Fq), CryptoError> {
        self.scale
            .ok_or_else(|| CryptoError::InvalidPoint("curve coefficient has no square root".into()))
    }

    fn coordinate(&self, v: &BigUint) -> Option<Fq> {
        (v < &self.p).then(|| Fq::from_le_bytes_mod_order(&v.to_bytes_le()))
    }

    /// Map a point into the reduced model, without checking the curve.
    fn reduced(&self, p: &EcPoint) -> Option<EdwardsAffine> {
        let (s, _) = self.scale.as_ref()?;
        let x = self.coordinate(&p.x)?;
        let y = self.coordinate(&p.y)?;
        Some(EdwardsAffine::new_unchecked(x * s, y))
    }

    fn to_affine(&self, p: &EcPoint) -> Result<EdwardsAffine, CryptoError> {
        self.scale()?;
        match self.reduced(p) {
            Some(point) if point.is_on_curve() => Ok(point),
            _ => Err(CryptoError::InvalidPoint(format!(
                "({}, {}) is not a {} point",
                p.x,
                p.y,
                self.name()
            ))),
        }
    }

    fn from_affine(&self, p: EdwardsAffine) -> Result<EcPoint, CryptoError> {
        let (_, s_inv) = self.scale()?;
        Ok(EcPoint::new(to_biguint(p.x * s_inv), to_biguint(p.y)))
    }
}

impl EcCryptoSuite for BabyJubJub {
    fn name(&self) -> &'static str {
        "babyjubjub"
    }

    fn field_modulus(&self) -> &BigUint {
        &self.p
    }

    fn base_point(&self) -> EcPoint {
        self.base8.clone()
    }

    fn subgroup_order(&self) -> &BigUint {
        &self.sub_order
    }

    fn identity(&self) -> EcPoint {
        EcPoint::new(BigUint::zero(), BigUint::one())
    }

    fn add(&self, a: &EcPoint, b: &EcPoint) -> Result<EcPoint, CryptoError> {
        let sum = self.to_affine(a)?.into_group() + self.to_affine(b)?.into_group();
        self.from_affine(sum.into_affine())
    }

    fn neg(&self, p: &EcPoint) -> Result<EcPoint, CryptoError> {
        self.from_affine(-self.to_affine(p)?)
    }

    fn mul_scalar(&self, p: &EcPoint, k: &BigUint) -> Result<EcPoint, CryptoError> {
        let product = self.to_affine(p)?.mul_bigint(k.to_u64_digits());
        self.from_affine(product.into_affine())
    }

    fn is_on_curve(&self, p: &EcPoint) -> bool {
        self.reduced(p).is_some_and(|point| point.is_on_curve())
    }

    fn is_in_subgroup(&self, p: &EcPoint) -> bool {
        self.reduced(p).is_some_and(|point| {
            point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR_X: &str =
        "995203441582195749578291179787384436505546430278305826713579947235728471134";
    const GENERATOR_Y: &str =
        "5472060717959818805561601436314318772137091100104008585924551046643952123905";

    /// Generator of the full curve group; `8·G` is the subgroup base point.
    fn full_generator() -> EcPoint {
        EcPoint::new(constant(GENERATOR_X), constant(GENERATOR_Y))
    }

    #[test]
    fn base_point_is_on_curve() {
        let curve = BabyJubJub::new();
        assert!(curve.is_on_curve(&curve.base_point()));
        assert!(curve.is_in_subgroup(&curve.base_point()));
        assert!(curve.is_on_curve(&curve.identity()));
        assert!(!curve.is_on_curve(&EcPoint::new(BigUint::from(1u8), BigUint::from(2u8))));
        assert!(!curve.is_on_curve(&EcPoint::zero()));
    }

    #[test]
    fn base_point_is_eight_times_generator() {
        let curve = BabyJubJub::new();
        let g = full_generator();
        assert!(curve.is_on_curve(&g));
        assert!(!curve.is_in_subgroup(&g));
        assert_eq!(curve.mul_scalar(&g, &BigUint::from(8u8)).unwrap(), curve.base_point());
    }

    #[test]
    fn base_point_has_subgroup_order() {
        let curve = BabyJubJub::new();
        let order = curve.subgroup_order().clone();
        assert_eq!(
            curve.mul_scalar(&curve.base_point(), &order).unwrap(),
            curve.identity()
        );
    }

    #[test]
    fn identity_is_neutral() {
        let curve = BabyJubJub::new();
        let b = curve.base_point();
        assert_eq!(curve.add(&b, &curve.identity()).unwrap(), b);
        assert_eq!(curve.mul_scalar(&b, &BigUint::zero()).unwrap(), curve.identity());
        assert_eq!(curve.mul_scalar(&b, &BigUint::one()).unwrap(), b);
        assert_eq!(curve.add(&b, &curve.neg(&b).unwrap()).unwrap(), curve.identity());
    }

    #[test]
    fn scalar_multiplication_distributes() {
        let curve = BabyJubJub::new();
        let b = curve.base_point();
        let two_b = curve.add(&b, &b).unwrap();
        let three_b = curve.add(&two_b, &b).unwrap();
        assert_eq!(curve.mul_scalar(&b, &BigUint::from(3u8)).unwrap(), three_b);
        assert!(curve.is_in_subgroup(&three_b));

        let k1 = BigUint::from(123_456_789u64);
        let k2 = BigUint::from(987_654_321u64);
        let lhs = curve.mul_scalar(&b, &(&k1 + &k2)).unwrap();
        let rhs = curve
            .add(
                &curve.mul_scalar(&b, &k1).unwrap(),
                &curve.mul_scalar(&b, &k2).unwrap(),
            )
            .unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn order_two_point_is_outside_subgroup() {
        let curve = BabyJubJub::new();
        let minus_one = curve.field_modulus() - 1u8;
        let t = EcPoint::new(BigUint::zero(), minus_one);
        assert!(curve.is_on_curve(&t));
        assert!(!curve.is_in_subgroup(&t));
        assert_eq!(curve.add(&t, &t).unwrap(), curve.identity());
    }

    #[test]
    fn off_curve_input_is_rejected() {
        let curve = BabyJubJub::new();
        let bad = EcPoint::new(BigUint::from(1u8), BigUint::from(2u8));
        let b = curve.base_point();
        assert!(matches!(curve.add(&b, &bad), Err(CryptoError::InvalidPoint(_))));
        assert!(matches!(
            curve.mul_scalar(&bad, &BigUint::from(5u8)),
            Err(CryptoError::InvalidPoint(_))
        ));
        assert!(matches!(curve.neg(&bad), Err(CryptoError::InvalidPoint(_))));

        let unreduced = EcPoint::new(b.x.clone() + curve.field_modulus(), b.y.clone());
        assert!(!curve.is_on_curve(&unreduced));
        assert!(curve.add(&unreduced, &b).is_err());
    }
}
