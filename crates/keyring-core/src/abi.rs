//! # Credential Contract ABI
//!
//! Calldata for the credential contract entry points used by the flow:
//!
//! - `createCredential(address,uint256,uint256,uint256,uint256,bytes,bytes,bytes)` (payable)
//! - `checkCredential(address,uint32) returns (bool)`
//! - `entityExp(uint256,address) returns (uint256)`
//!
//! Arguments are encoded with [`ethers_core::abi::encode`] behind the
//! four-byte Keccak-256 selector; return words are decoded with
//! [`ethers_core::abi::decode`].

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;
use ethers_core::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;
use crate::bigint::{bytes_to_hex, hex_to_bytes};
use crate::error::ValidationError;
use crate::zkpg::CredentialUpdateCalldata;

/// Canonical signature of the credential creation call.
pub const CREATE_CREDENTIAL_SIGNATURE: &str =
    "createCredential(address,uint256,uint256,uint256,uint256,bytes,bytes,bytes)";

/// Canonical signature of the credential check call.
pub const CHECK_CREDENTIAL_SIGNATURE: &str = "checkCredential(address,uint32)";

/// Canonical signature of the credential expiry getter.
pub const ENTITY_EXP_SIGNATURE: &str = "entityExp(uint256,address)";

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn call(signature: &str, args: &[Token]) -> String {
    let mut data = selector(signature).to_vec();
    data.extend(abi::encode(args));
    bytes_to_hex(&data)
}

/// ABI-encode `createCredential` calldata as `0x` hex.
pub fn encode_create_credential(
    calldata: &CredentialUpdateCalldata,
) -> Result<String, ValidationError> {
    Ok(call(
        CREATE_CREDENTIAL_SIGNATURE,
        &[
            Token::Address(calldata.trader.address()),
            Token::Uint(U256::from(calldata.policy_id)),
            Token::Uint(U256::from(calldata.chain_id)),
            Token::Uint(U256::from(calldata.valid_until)),
            Token::Uint(U256::from(calldata.cost)),
            Token::Bytes(hex_to_bytes(&calldata.key)?),
            Token::Bytes(hex_to_bytes(&calldata.signature)?),
            Token::Bytes(hex_to_bytes(&calldata.backdoor)?),
        ],
    ))
}

/// ABI-encode `checkCredential(address,uint32)` calldata as `0x` hex.
pub fn encode_check_credential(address: &EvmAddress, policy_id: u32) -> String {
    call(
        CHECK_CREDENTIAL_SIGNATURE,
        &[
            Token::Address(address.address()),
            Token::Uint(U256::from(policy_id)),
        ],
    )
}

/// ABI-encode `entityExp(uint256,address)` calldata as `0x` hex.
///
/// The call returns the credential expiry in unix seconds, `0` when no
/// credential exists. Feed the decoded value to
/// [`CredentialStatus::from_expiry`].
pub fn encode_entity_exp(policy_id: u64, address: &EvmAddress) -> String {
    call(
        ENTITY_EXP_SIGNATURE,
        &[
            Token::Uint(U256::from(policy_id)),
            Token::Address(address.address()),
        ],
    )
}

fn decode_single(return_data: &str, kind: ParamType) -> Result<Token, ValidationError> {
    let bytes = hex_to_bytes(return_data)?;
    let invalid = || ValidationError::InvalidReturnData(return_data.to_string());
    if bytes.len() != 32 {
        return Err(invalid());
    }
    abi::decode(&[kind], &bytes)
        .map_err(|_| invalid())?
        .pop()
        .ok_or_else(invalid)
}

/// Decode a single `bool` return word.
pub fn decode_bool(return_data: &str) -> Result<bool, ValidationError> {
    decode_single(return_data, ParamType::Bool)?
        .into_bool()
        .ok_or_else(|| ValidationError::InvalidReturnData(return_data.to_string()))
}

/// Decode a single `uint256` return word.
pub fn decode_uint(return_data: &str) -> Result<U256, ValidationError> {
    decode_single(return_data, ParamType::Uint(256))?
        .into_uint()
        .ok_or_else(|| ValidationError::InvalidReturnData(return_data.to_string()))
}

/// On-chain credential state derived from its expiry timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Credential exists and has not expired.
    Valid,
    /// Credential existed but its expiry has passed.
    Expired,
    /// No credential was ever created.
    NoCredential,
}

impl CredentialStatus {
    /// Classify an expiry (unix seconds) against `now` (unix seconds).
    pub fn from_expiry(expiry: u64, now: u64) -> Self {
        if expiry == 0 {
            Self::NoCredential
        } else if now < expiry {
            Self::Valid
        } else {
            Self::Expired
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::NoCredential => "no_credential",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calldata() -> CredentialUpdateCalldata {
        CredentialUpdateCalldata {
            trader: EvmAddress::new("0x00000000000000000000000000000000000000aa").unwrap(),
            policy_id: 7,
            chain_id: 1,
            valid_until: 3600,
            cost: 100,
            key: "0x0102".into(),
            signature: "0x".into(),
            backdoor: format!("0x{}", "ff".repeat(33)),
        }
    }

    fn word(n: u64) -> [u8; 32] {
        let mut w = [0u8; 32];
        w[24..].copy_from_slice(&n.to_be_bytes());
        w
    }

    #[test]
    fn erc20_transfer_selector_matches_known_value() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn create_credential_layout() {
        let hex = encode_create_credential(&calldata()).unwrap();
        let bytes = hex_to_bytes(&hex).unwrap();
        assert_eq!(&bytes[..4], &selector(CREATE_CREDENTIAL_SIGNATURE));

        let body = &bytes[4..];
        let at = |i: usize| &body[i * 32..(i + 1) * 32];
        // Offsets: key at 256, signature at 256+64, backdoor at 256+64+32.
        assert_eq!(at(5), word(256));
        assert_eq!(at(6), word(320));
        assert_eq!(at(7), word(352));
        // backdoor: 33 bytes spill into two words.
        assert_eq!(at(11), word(33));
        assert_eq!(body.len(), 14 * 32);

        let uint = ParamType::Uint(256);
        let tokens = abi::decode(
            &[
                ParamType::Address,
                uint.clone(),
                uint.clone(),
                uint.clone(),
                uint,
                ParamType::Bytes,
                ParamType::Bytes,
                ParamType::Bytes,
            ],
            body,
        )
        .unwrap();
        let c = calldata();
        assert_eq!(
            tokens,
            vec![
                Token::Address(c.trader.address()),
                Token::Uint(U256::from(7u64)),
                Token::Uint(U256::from(1u64)),
                Token::Uint(U256::from(3600u64)),
                Token::Uint(U256::from(100u64)),
                Token::Bytes(vec![1, 2]),
                Token::Bytes(vec![]),
                Token::Bytes(vec![0xff; 33]),
            ]
        );
    }

    #[test]
    fn rejects_non_hex_byte_fields() {
        let mut c = calldata();
        c.key = "0xzz".into();
        assert!(matches!(
            encode_create_credential(&c),
            Err(ValidationError::InvalidHex(_))
        ));
    }

    #[test]
    fn check_credential_layout() {
        let addr = EvmAddress::new("0x00000000000000000000000000000000000000aa").unwrap();
        let hex = encode_check_credential(&addr, 7);
        assert_eq!(hex.len(), 2 + 2 * (4 + 64));
        assert!(hex.ends_with("07"));
    }

    #[test]
    fn entity_exp_puts_policy_first() {
        let addr = EvmAddress::new("0x00000000000000000000000000000000000000AA").unwrap();
        let bytes = hex_to_bytes(&encode_entity_exp(7, &addr)).unwrap();
        assert_eq!(&bytes[..4], &selector(ENTITY_EXP_SIGNATURE));
        assert_eq!(bytes[4 + 31], 7);
        assert_eq!(bytes[4 + 63], 0xaa);
    }

    #[test]
    fn decodes_return_words() {
        let one = format!("0x{}01", "00".repeat(31));
        assert!(decode_bool(&one).unwrap());
        assert!(!decode_bool(&format!("0x{}", "00".repeat(32))).unwrap());
        assert!(matches!(
            decode_bool("0x01"),
            Err(ValidationError::InvalidReturnData(_))
        ));
        assert_eq!(decode_uint(&one).unwrap(), U256::one());
        let expiry = format!("0x{}", hex::encode(word(1_700_003_600)));
        assert_eq!(decode_uint(&expiry).unwrap().as_u64(), 1_700_003_600);
    }

    #[test]
    fn credential_status_from_expiry() {
        assert_eq!(CredentialStatus::from_expiry(0, 100), CredentialStatus::NoCredential);
        assert_eq!(CredentialStatus::from_expiry(200, 100), CredentialStatus::Valid);
        assert_eq!(CredentialStatus::from_expiry(100, 100), CredentialStatus::Expired);
    }
}
