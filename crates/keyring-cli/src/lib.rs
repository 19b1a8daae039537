//! # keyring-cli -- Command-line front end for Keyring Connect
//!
//! Provides the `keyring` binary:
//!
//! - `keyring artifacts` -- prefetch, inspect, or clear the circuit artifact cache.
//! - `keyring policies` -- list the application's or the public policies.
//! - `keyring env` / `keyring policy` -- persisted environment and policy selection.
//! - `keyring prove` -- generate a proof, obtain the blinded signature, and
//!   print the `createCredential` calldata.
//!
//! ```bash
//! keyring env set dev
//! keyring policy select 7
//! keyring prove --wallet 0x... --chain-id 1 --user-id u-1
//! ```
//!
//! Backend calls that need the application API key read `KEYRING_API_URL`
//! and `KEYRING_API_KEY` from the environment.

pub mod artifacts;
pub mod policies;
pub mod preferences;
pub mod prove;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use keyring_core::KeyringZkpgConfig;
use keyring_crypto::BabyJubJub;
use keyring_zkpg::{KeyringZkpg, KeyringZkpgOptions, ProvingBackend};

/// Options shared by every subcommand that builds an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Artifact cache root override.
    pub cache_dir: Option<PathBuf>,
    /// Use buffered local time instead of the server clock.
    pub use_local_time: bool,
    /// Promote the orchestrator's step trace to `info`.
    pub debug: bool,
}

/// Build an orchestrator from `KEYRING_ZKPG_*` environment configuration.
pub fn orchestrator(
    backend: Arc<dyn ProvingBackend>,
    opts: &RuntimeOptions,
) -> Result<KeyringZkpg> {
    let config = KeyringZkpgConfig::from_env().context("invalid KEYRING_ZKPG configuration")?;
    Ok(KeyringZkpg::with_config(
        config,
        Arc::new(BabyJubJub::new()),
        backend,
        KeyringZkpgOptions {
            debug: opts.debug,
            use_local_time: opts.use_local_time,
            config: Default::default(),
            cache_dir: opts.cache_dir.clone(),
            scheme: None,
        },
    ))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
