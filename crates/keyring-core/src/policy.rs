//! # Policies
//!
//! An attestation policy as served by the Keyring backend: duration, cost
//! (flat or per chain), the issuer's RSA public key, and the regime key used
//! for the encrypted backdoor field.
//!
//! Policies are immutable once fetched. Key material stays in its wire form
//! (decimal strings) here; parsing into big integers happens at the point of
//! use through [`crate::bigint::parse_decimal`].

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::bigint::parse_decimal;
use crate::error::ValidationError;

/// Policy selected when a persisted selection is not present in the list.
pub const DEFAULT_POLICY_ID: u64 = 7;

/// The issuer's RSA public key, as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySchema {
    /// Modulus.
    pub n: String,
    /// Public exponent.
    pub e: String,
}

impl PublicKeySchema {
    /// Parse `(n, e)` into big integers.
    pub fn parse(&self) -> Result<(BigUint, BigUint), ValidationError> {
        Ok((
            parse_decimal("public_key.n", &self.n)?,
            parse_decimal("public_key.e", &self.e)?,
        ))
    }
}

/// A regime public key point, as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeKeySchema {
    /// Affine x coordinate.
    pub x: String,
    /// Affine y coordinate.
    pub y: String,
}

impl RegimeKeySchema {
    /// Parse `(x, y)` into big integers.
    pub fn parse(&self) -> Result<(BigUint, BigUint), ValidationError> {
        Ok((
            parse_decimal("regime_key.x", &self.x)?,
            parse_decimal("regime_key.y", &self.y)?,
        ))
    }
}

/// Cost of a policy on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCost {
    /// Chain the cost applies to.
    pub chain_id: u64,
    /// Cost in the chain's native unit.
    pub cost: u64,
    /// Policy identifier on that chain.
    pub policy_id: u64,
}

/// Product line a policy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Keyring Pro.
    Pro,
    /// Keyring Connect.
    Connect,
    /// Both products.
    ProConnect,
    /// A type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl PolicyType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pro => "pro",
            Self::Connect => "connect",
            Self::ProConnect => "pro_connect",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attestation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Backend identifier.
    pub id: u64,
    /// On-chain identifier, when it differs from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_id: Option<u64>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Credential lifetime in seconds.
    #[serde(default)]
    pub duration: u64,
    /// Flat cost, used when no per-chain entry matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    /// Per-chain costs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<Vec<PolicyCost>>,
    /// Issuer RSA public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKeySchema>,
    /// Regime public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime_key: Option<RegimeKeySchema>,
    /// Product line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<PolicyType>,
}

impl Policy {
    /// Cost on `chain_id`: the matching per-chain entry, else the flat cost.
    pub fn cost_for_chain(&self, chain_id: u64) -> Option<u64> {
        self.costs
            .as_ref()
            .and_then(|costs| costs.iter().find(|c| c.chain_id == chain_id))
            .map(|c| c.cost)
            .or(self.cost)
    }

    /// Identifier written into credential calldata.
    pub fn onchain_policy_id(&self) -> u64 {
        self.onchain_id.unwrap_or(self.id)
    }

    /// The RSA public key, or [`ValidationError::MissingField`].
    pub fn require_public_key(&self) -> Result<&PublicKeySchema, ValidationError> {
        self.public_key
            .as_ref()
            .ok_or_else(|| ValidationError::MissingField("policy.public_key".into()))
    }

    /// The regime key, or [`ValidationError::MissingField`].
    pub fn require_regime_key(&self) -> Result<&RegimeKeySchema, ValidationError> {
        self.regime_key
            .as_ref()
            .ok_or_else(|| ValidationError::MissingField("policy.regime_key".into()))
    }

    /// Whether the policy is offered through Keyring Connect.
    pub fn is_connect(&self) -> bool {
        matches!(self.policy_type, Some(PolicyType::Connect))
    }
}

/// Outcome of reconciling a persisted selection with a fresh policy list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The persisted selection is still current.
    Unchanged,
    /// The selection must be replaced with this policy.
    Replace(Policy),
}

/// Reconcile a persisted policy selection against the policies currently
/// offered by the backend.
///
/// - Selection absent from the list: pick [`DEFAULT_POLICY_ID`] if listed,
///   else the first policy.
/// - Public key modulus differs (environment switch): take the fresh copy.
/// - Selection lacks per-chain costs that the fresh copy has: take the
///   fresh copy.
///
/// An empty list leaves the selection untouched.
pub fn reconcile_selection(selected: Option<&Policy>, available: &[Policy]) -> Reconciled {
    let Some(first) = available.first() else {
        return Reconciled::Unchanged;
    };
    let current = selected.and_then(|s| available.iter().find(|p| p.id == s.id));
    let (Some(selected), Some(current)) = (selected, current) else {
        let fallback = available
            .iter()
            .find(|p| p.id == DEFAULT_POLICY_ID)
            .unwrap_or(first);
        return Reconciled::Replace(fallback.clone());
    };

    let modulus = |p: &Policy| p.public_key.as_ref().map(|k| k.n.clone());
    if modulus(selected) != modulus(current) {
        return Reconciled::Replace(current.clone());
    }
    if selected.costs.is_none() && current.costs.is_some() {
        return Reconciled::Replace(current.clone());
    }
    Reconciled::Unchanged
}
