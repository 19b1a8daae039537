//! # Deployment Environments
//!
//! Keyring runs a `dev` and a `prod` backend. Each has its own API base URL
//! and its own credential contract deployment per chain.

use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;
use crate::error::ValidationError;

/// Backend deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development backend.
    Dev,
    /// Production backend.
    #[default]
    Prod,
}

/// Mainnet chain id.
pub const CHAIN_MAINNET: u64 = 1;
/// Optimism chain id.
pub const CHAIN_OPTIMISM: u64 = 10;
/// Polygon chain id.
pub const CHAIN_POLYGON: u64 = 137;
/// zkSync Era chain id.
pub const CHAIN_ZKSYNC: u64 = 324;
/// Base chain id.
pub const CHAIN_BASE: u64 = 8453;
/// Holesky testnet chain id.
pub const CHAIN_HOLESKY: u64 = 17000;
/// Arbitrum One chain id.
pub const CHAIN_ARBITRUM: u64 = 42161;
/// Avalanche C-Chain id.
pub const CHAIN_AVALANCHE: u64 = 43114;

const PROD_CONTRACTS: &[(u64, &str)] = &[
    (CHAIN_MAINNET, "0xD18d17791f2071Bf3C855bA770420a9EdEa0728d"),
    (CHAIN_OPTIMISM, "0x88e097C960aD0239B4eEC6E8C5B4f74f898eFdA3"),
    (CHAIN_ARBITRUM, "0x88e097C960aD0239B4eEC6E8C5B4f74f898eFdA3"),
    (CHAIN_BASE, "0x88e097C960aD0239B4eEC6E8C5B4f74f898eFdA3"),
    (CHAIN_AVALANCHE, "0x88e097C960aD0239B4eEC6E8C5B4f74f898eFdA3"),
    (CHAIN_POLYGON, "0x88e097C960aD0239B4eEC6E8C5B4f74f898eFdA3"),
    (CHAIN_ZKSYNC, "0x617534538624ae12AC8F5A12cbC22491FED7D63D"),
];

const DEV_CONTRACTS: &[(u64, &str)] = &[
    (CHAIN_MAINNET, "0x2eb474cffabca358d9fd3f1d43ad2b2dfb809b0e"),
    (CHAIN_OPTIMISM, "0x292f87b46d36db555802d9b444716645053a1963"),
    (CHAIN_ARBITRUM, "0x1c7b604a7d738ecbb0f5e44718ade4bc58a454aa"),
    (CHAIN_BASE, "0x357c67a218dcf4d93189a6c4fd8483d5396d643d"),
    (CHAIN_ZKSYNC, "0x997D1fEec48907675fcA3Ad47962B571c534419D"),
    (CHAIN_AVALANCHE, "0x8a16f136121fd53b5c72c3414b42299f972c9c67"),
    (CHAIN_POLYGON, "0x8a16f136121fd53b5c72c3414b42299f972c9c67"),
    (CHAIN_HOLESKY, "0x53370173a6939f0538d0fb0f7cc653e53bf9801a"),
];

impl Environment {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Base URL of the backend API.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Self::Dev => "https://main.api.keyring-backend.krndev.net",
            Self::Prod => "https://main.api.keyring-backend.krnprod.net",
        }
    }

    /// Credential contract on `chain_id`, if deployed.
    pub fn credential_contract(&self, chain_id: u64) -> Option<EvmAddress> {
        let table = match self {
            Self::Dev => DEV_CONTRACTS,
            Self::Prod => PROD_CONTRACTS,
        };
        table
            .iter()
            .find(|(id, _)| *id == chain_id)
            .and_then(|(_, addr)| EvmAddress::new(*addr).ok())
    }

    /// Chains with a credential contract in this environment.
    pub fn supported_chains(&self) -> Vec<u64> {
        let table = match self {
            Self::Dev => DEV_CONTRACTS,
            Self::Prod => PROD_CONTRACTS,
        };
        table.iter().map(|(id, _)| *id).collect()
    }
}

impl std::str::FromStr for Environment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            _ => Err(ValidationError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_is_a_valid_address() {
        for env in [Environment::Dev, Environment::Prod] {
            for chain in env.supported_chains() {
                assert!(env.credential_contract(chain).is_some(), "{env} {chain}");
            }
        }
    }

    #[test]
    fn holesky_is_dev_only() {
        assert!(Environment::Dev.credential_contract(CHAIN_HOLESKY).is_some());
        assert!(Environment::Prod.credential_contract(CHAIN_HOLESKY).is_none());
    }

    #[test]
    fn parses_names() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert!("staging".parse::<Environment>().is_err());
        assert_eq!(Environment::default(), Environment::Prod);
    }
}
