//! # Proof Request and Calldata Types
//!
//! [`KeyringZkpgInput`] is constructed per proof request.
//! [`CredentialUpdateCalldata`] is the final, immutable argument tuple for
//! the on-chain `createCredential` call.

use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;
use crate::error::ValidationError;
use crate::policy::Policy;

/// Input to proof generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringZkpgInput {
    /// Wallet the credential is issued to.
    pub trading_wallet: EvmAddress,
    /// Policy the credential attests to.
    pub policy: Policy,
    /// Target chain.
    pub chain_id: u64,
}

impl KeyringZkpgInput {
    /// Check that the request carries everything proof generation needs.
    ///
    /// The wallet is already validated by construction. This checks the
    /// chain id and that both policy keys are present and parse as decimal
    /// integers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chain_id == 0 {
            return Err(ValidationError::InvalidChainId(self.chain_id));
        }
        self.policy.require_public_key()?.parse()?;
        self.policy.require_regime_key()?.parse()?;
        Ok(())
    }
}

/// Arguments of `createCredential(address,uint256,uint256,uint256,uint256,bytes,bytes,bytes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdateCalldata {
    /// Credential holder.
    pub trader: EvmAddress,
    /// On-chain policy identifier.
    #[serde(alias = "onchainPolicyId")]
    pub policy_id: u64,
    /// Target chain.
    pub chain_id: u64,
    /// Expiry, unix seconds.
    pub valid_until: u64,
    /// Fee paid with the transaction.
    pub cost: u64,
    /// `0x` hex of the RSA modulus.
    pub key: String,
    /// `0x` hex of the unblinded RSA signature.
    pub signature: String,
    /// `0x` hex of the packed regime encryptions.
    pub backdoor: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PublicKeySchema, RegimeKeySchema};

    fn input() -> KeyringZkpgInput {
        KeyringZkpgInput {
            trading_wallet: EvmAddress::new("0xAbC0000000000000000000000000000000000001").unwrap(),
            policy: Policy {
                id: 7,
                onchain_id: None,
                name: "Connect".into(),
                duration: 3600,
                cost: Some(100),
                costs: None,
                public_key: Some(PublicKeySchema {
                    n: "3233".into(),
                    e: "17".into(),
                }),
                regime_key: Some(RegimeKeySchema {
                    x: "1".into(),
                    y: "2".into(),
                }),
                policy_type: None,
            },
            chain_id: 1,
        }
    }

    #[test]
    fn valid_input_passes() {
        input().validate().unwrap();
    }

    #[test]
    fn zero_chain_id_is_rejected() {
        let mut i = input();
        i.chain_id = 0;
        assert_eq!(i.validate().unwrap_err(), ValidationError::InvalidChainId(0));
    }

    #[test]
    fn non_decimal_modulus_is_rejected() {
        let mut i = input();
        i.policy.public_key = Some(PublicKeySchema {
            n: "0xff".into(),
            e: "17".into(),
        });
        assert!(matches!(
            i.validate(),
            Err(ValidationError::InvalidDecimal { .. })
        ));
    }

    #[test]
    fn calldata_serializes_camel_case_and_accepts_legacy_name() {
        let calldata = CredentialUpdateCalldata {
            trader: EvmAddress::new("0xAbC0000000000000000000000000000000000001").unwrap(),
            policy_id: 7,
            chain_id: 1,
            valid_until: 1_700_003_600,
            cost: 100,
            key: "0xca1".into(),
            signature: "0x0001".into(),
            backdoor: "0x".into(),
        };
        let json = serde_json::to_value(&calldata).unwrap();
        assert_eq!(json["policyId"], 7);
        assert_eq!(json["validUntil"], 1_700_003_600u64);

        let legacy = serde_json::json!({
            "trader": "0xAbC0000000000000000000000000000000000001",
            "onchainPolicyId": 7,
            "chainId": 1,
            "validUntil": 1_700_003_600u64,
            "cost": 100,
            "key": "0xca1",
            "signature": "0x0001",
            "backdoor": "0x"
        });
        let parsed: CredentialUpdateCalldata = serde_json::from_value(legacy).unwrap();
        assert_eq!(parsed, calldata);
    }
}
