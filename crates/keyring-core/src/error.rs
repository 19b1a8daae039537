//! # Error Types
//!
//! Validation and configuration errors shared by the whole workspace.
//! Each variant carries the offending input so misconfiguration can be
//! diagnosed from the message alone.

use thiserror::Error;

/// Validation failures for domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is not `0x` followed by 40 hex digits.
    #[error("invalid EVM address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidAddress(String),

    /// A big-integer field is not a plain decimal string.
    #[error("invalid decimal integer for {field}: \"{value}\"")]
    InvalidDecimal {
        /// The field being parsed (e.g. `public_key.n`).
        field: String,
        /// The rejected input.
        value: String,
    },

    /// Hex input could not be decoded.
    #[error("invalid hex string: \"{0}\"")]
    InvalidHex(String),

    /// Contract return data does not decode as the expected ABI type.
    #[error("invalid ABI return data: {0}")]
    InvalidReturnData(String),

    /// A required field is absent or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Chain identifiers start at 1.
    #[error("invalid chain id: {0}")]
    InvalidChainId(u64),

    /// Integer does not fit in the requested byte width.
    #[error("value for {field} does not fit in {max_bytes} bytes")]
    ValueTooLarge {
        /// The field being encoded.
        field: String,
        /// Maximum encoded width.
        max_bytes: usize,
    },

    /// Environment name is neither `dev` nor `prod`.
    #[error("unknown environment: \"{0}\" (expected dev or prod)")]
    UnknownEnvironment(String),
}

/// Configuration loading failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A URL setting does not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),

    /// A numeric setting does not parse.
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(String, String),

    /// A required environment variable is missing.
    #[error("{0} environment variable is required")]
    Missing(String),

    /// A setting holds characters it cannot carry, e.g. a header value.
    #[error("invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_decimal_names_field_and_value() {
        let err = ValidationError::InvalidDecimal {
            field: "public_key.n".into(),
            value: "12a".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("public_key.n"));
        assert!(msg.contains("12a"));
    }

    #[test]
    fn value_too_large_display() {
        let err = ValidationError::ValueTooLarge {
            field: "cost".into(),
            max_bytes: 32,
        };
        assert!(format!("{err}").contains("32 bytes"));
    }

    #[test]
    fn config_missing_display() {
        let err = ConfigError::Missing("KEYRING_API_KEY".into());
        assert_eq!(
            format!("{err}"),
            "KEYRING_API_KEY environment variable is required"
        );
    }
}
