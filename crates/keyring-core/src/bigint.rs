//! # Big-Integer Codecs
//!
//! The backend transports every cryptographic integer as a decimal string;
//! calldata and proofs leave the system as `0x` hex. This module is the only
//! place those conversions happen.

use num_bigint::BigUint;
use num_traits::Num;

use crate::error::ValidationError;

/// Parse a non-negative decimal string into a [`BigUint`].
///
/// Only ASCII digits are accepted: no sign, no whitespace, no `0x` prefix.
/// `field` names the input in the error message.
pub fn parse_decimal(field: &str, value: &str) -> Result<BigUint, ValidationError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidDecimal {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    BigUint::from_str_radix(value, 10).map_err(|_| ValidationError::InvalidDecimal {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Format a [`BigUint`] as a decimal string.
pub fn to_decimal(value: &BigUint) -> String {
    value.to_str_radix(10)
}

/// Format a [`BigUint`] as lowercase `0x` hex with no leading zero padding.
///
/// Zero is rendered as `0x0`, matching the hexlify convention used for
/// proof coordinates.
pub fn to_hex(value: &BigUint) -> String {
    format!("0x{}", value.to_str_radix(16))
}

/// Convert a decimal string directly to `0x` hex.
pub fn decimal_to_hex(field: &str, value: &str) -> Result<String, ValidationError> {
    parse_decimal(field, value).map(|v| to_hex(&v))
}

/// Big-endian bytes of `value`, left-padded with zeros to `len` bytes.
pub fn to_padded_bytes(
    field: &str,
    value: &BigUint,
    len: usize,
) -> Result<Vec<u8>, ValidationError> {
    let raw = value.to_bytes_be();
    // BigUint encodes zero as a single 0x00 byte.
    let raw: &[u8] = if raw == [0] { &[] } else { &raw };
    if raw.len() > len {
        return Err(ValidationError::ValueTooLarge {
            field: field.to_string(),
            max_bytes: len,
        });
    }
    let mut out = vec![0u8; len - raw.len()];
    out.extend_from_slice(raw);
    Ok(out)
}

/// Encode bytes as lowercase `0x` hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode `0x`-prefixed (or bare) hex into bytes.
pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>, ValidationError> {
    let stripped = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(stripped).map_err(|_| ValidationError::InvalidHex(value.to_string()))
}
