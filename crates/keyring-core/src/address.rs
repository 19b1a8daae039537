//! # EVM Addresses
//!
//! A validated 20-byte account address backed by
//! [`ethers_core::types::Address`]. The textual form the caller supplied is
//! kept for display and serialization, so calldata echoes back exactly what
//! was sent. Equality and hashing use the 20 bytes only: the checksummed
//! and lowercase spellings of one wallet are the same address.

use std::hash::{Hash, Hasher};

use ethers_core::types::Address;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A 20-byte EVM account address in `0x` + 40 hex digit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvmAddress {
    text: String,
    address: Address,
}

impl EvmAddress {
    /// Validate and wrap an address string.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let text = value.into();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .filter(|d| d.len() == 40 && d.bytes().all(|b| b.is_ascii_hexdigit()));
        let Some(address) = digits.and_then(|d| d.parse::<Address>().ok()) else {
            return Err(ValidationError::InvalidAddress(text));
        };
        Ok(Self { text, address })
    }

    /// The address as supplied.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The underlying ethers address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The 20 raw address bytes.
    pub fn to_bytes(&self) -> [u8; 20] {
        self.address.to_fixed_bytes()
    }

    /// EIP-55 mixed-case form.
    pub fn to_checksum(&self) -> String {
        ethers_core::utils::to_checksum(&self.address, None)
    }
}

impl PartialEq for EvmAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for EvmAddress {}

impl Hash for EvmAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl From<Address> for EvmAddress {
    fn from(address: Address) -> Self {
        Self {
            text: ethers_core::utils::to_checksum(&address, None),
            address,
        }
    }
}

impl TryFrom<String> for EvmAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EvmAddress> for String {
    fn from(value: EvmAddress) -> Self {
        value.text
    }
}

impl std::str::FromStr for EvmAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
