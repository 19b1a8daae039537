//! # Policies Subcommand
//!
//! Lists policies either through the authenticated L1 API (requires
//! `KEYRING_API_URL` / `KEYRING_API_KEY`) or, with `--public`, through the
//! keyless public listing of the selected environment.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use keyring_client::{KeyringApiConfig, KeyringClient};

use crate::preferences::Preferences;

/// Arguments for `keyring policies`.
#[derive(Args, Debug)]
pub struct PoliciesArgs {
    /// One-based page number (L1 listing only).
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Page size (L1 listing only).
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
    /// Use the public listing of the selected environment.
    #[arg(long)]
    pub public: bool,
    /// With `--public`, only list Connect policies.
    #[arg(long, requires = "public")]
    pub connect: bool,
}

/// Execute `keyring policies`.
pub async fn run_policies(args: &PoliciesArgs, prefs_path: &Path) -> Result<u8> {
    if args.public {
        let prefs = Preferences::load(prefs_path)?;
        let client = KeyringClient::new(KeyringApiConfig::public(prefs.environment)?)?;
        if args.connect {
            let policies = client
                .connect_policies()
                .await
                .context("failed to list Connect policies")?;
            crate::print_json(&policies)?;
        } else {
            let page = client.public_policies().await.context("failed to list public policies")?;
            crate::print_json(&page)?;
        }
        return Ok(0);
    }

    let config = KeyringApiConfig::from_env().context("Keyring API configuration")?;
    let client = KeyringClient::new(config)?;
    let page = client
        .policies(args.page, args.page_size)
        .await
        .context("failed to list policies")?;
    crate::print_json(&page)?;
    Ok(0)
}
