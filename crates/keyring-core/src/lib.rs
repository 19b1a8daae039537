#![deny(missing_docs)]

//! # keyring-core -- Foundational Types for Keyring Connect
//!
//! Every other crate in the workspace depends on the types defined here.
//! The crate has no internal dependencies and performs no I/O.
//!
//! ## Design Principles
//!
//! 1. **Decimal strings at the edges, big integers inside.** RSA moduli,
//!    exponents and regime coordinates arrive from the backend as decimal
//!    strings. They are parsed into [`num_bigint::BigUint`] through
//!    [`bigint::parse_decimal`] and formatted back losslessly.
//!
//! 2. **`0x` hex on the way out.** Proof coordinates and every byte field of
//!    [`CredentialUpdateCalldata`] are lowercase `0x`-prefixed hex.
//!
//! 3. **Validated newtypes.** A trading wallet is an [`EvmAddress`], never a
//!    bare string.

pub mod abi;
pub mod address;
pub mod bigint;
pub mod config;
pub mod environment;
pub mod error;
pub mod policy;
pub mod temporal;
pub mod zkpg;

pub use abi::CredentialStatus;
pub use address::EvmAddress;
pub use config::{ArtifactUrls, KeyringZkpgConfig, KeyringZkpgConfigOverrides};
pub use environment::Environment;
pub use error::{ConfigError, ValidationError};
pub use policy::{
    reconcile_selection, Policy, PolicyCost, PolicyType, PublicKeySchema, Reconciled,
    RegimeKeySchema, DEFAULT_POLICY_ID,
};
pub use zkpg::{CredentialUpdateCalldata, KeyringZkpgInput};
