//! Errors raised by credential cryptography.

use keyring_core::ValidationError;
use thiserror::Error;

/// Cryptographic failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Malformed input value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// RSA key parameters are unusable.
    #[error("invalid RSA key: {0}")]
    InvalidKey(String),

    /// Element is not invertible modulo the RSA modulus.
    #[error("value is not invertible modulo n")]
    NotInvertible,

    /// Group element is not reduced modulo the RSA modulus.
    #[error("group element out of range for modulus")]
    OutOfRange,

    /// Point is not a valid subgroup element.
    #[error("invalid curve point: {0}")]
    InvalidPoint(String),

    /// The unblinded signature does not verify against the message.
    #[error("signature verification failed")]
    VerificationFailed,
}
