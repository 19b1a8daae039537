//! # keyring-crypto -- Credential Cryptography
//!
//! The cryptographic building blocks of a Keyring Connect credential:
//!
//! - **Elliptic-curve suite** ([`EcCryptoSuite`]) injected into the
//!   orchestrator, with [`BabyJubJub`] as the default implementation.
//! - **Regime encryptions**: ElGamal encryptions of the credential trapdoor
//!   under each policy regime key, packed into the calldata `backdoor`.
//! - **RSA blind signatures**: blinding factor generation, blinding,
//!   unblinding and verification against the issuer's public key.
//! - **Trapdoor**: the per-credential secret the regime encryptions carry.
//!
//! ## Crate Policy
//!
//! - Depends only on `keyring-core` internally.
//! - No global state: the curve suite is a value passed by the caller.
//! - Secret scalars (trapdoor, blinding factor) are never serialized and
//!   are cleared on drop.

pub mod ec;
pub mod error;
pub mod regime;
pub mod rsa;
pub mod trapdoor;

pub use ec::{BabyJubJub, EcCryptoSuite, EcPoint};
pub use error::CryptoError;
pub use regime::{PolicyRegimes, RegimeEncryption, RegimeKey, N_REGIMES};
pub use rsa::{BlindingFactor, RsaGroupElement, RsaPrivateKey, RsaPublicKey};
pub use trapdoor::Trapdoor;
