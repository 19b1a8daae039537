//! Request and response types of the Keyring backend.
//!
//! Response types are lenient: optional fields default, unknown fields are
//! ignored, so schema additions upstream do not break decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A page of results.
///
/// The backend uses two layouts: `{count, next, previous, results}` on the
/// public API and `{results, total, page, page_size}` on the L1 API. Both
/// decode into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    /// Total number of items, from `total` or `count`.
    #[serde(default, alias = "count", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// One-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// URL of the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// URL of the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// Total item count, falling back to the page length.
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(self.results.len() as u64)
    }
}

/// A user registered by the integrating application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier.
    pub id: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
}

/// Request to create a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Attestation status of a user for one policy.
///
/// Only `status` is interpreted; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Status label.
    #[serde(default)]
    pub status: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of validating onboarding data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateDataResponse {
    /// Validation outcome.
    pub status: String,
}

/// Proof submitted in exchange for a blinded signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlindedSignatureRequest {
    /// Groth16 proof object.
    pub proof: Value,
    /// Public signals, decimal strings.
    pub public_signals: Vec<String>,
}

/// The issuer's signature over the blinded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedSignatureResponse {
    /// Decimal blinded signature.
    pub blinded_signature: String,
}
