//! # Persisted Preferences
//!
//! The selected environment and policy survive between invocations in a
//! small JSON file. The stored policy is a snapshot: before use it is
//! reconciled against the live public listing, so a policy that vanished,
//! changed issuer key, or gained per-chain costs is refreshed.
//!
//! Default location: `{config_dir}/keyring-zkpg/preferences.json`,
//! overridable with `--prefs`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use keyring_client::{KeyringApiConfig, KeyringClient};
use keyring_core::policy::{reconcile_selection, Reconciled};
use keyring_core::{Environment, Policy};
use serde::{Deserialize, Serialize};

/// File name of the preferences document.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Default preferences path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("keyring-zkpg"))
        .unwrap_or_else(|| PathBuf::from(".keyring-zkpg"))
        .join(PREFERENCES_FILE)
}

/// Persisted user choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Backend environment.
    #[serde(default)]
    pub environment: Environment,
    /// Last selected policy snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_policy: Option<Policy>,
}

impl Preferences {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let rendered =
            serde_json::to_string_pretty(self).context("failed to serialize preferences")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Bring the selection up to date with `available`. Returns whether it
    /// changed.
    pub fn reconcile(&mut self, available: &[Policy]) -> bool {
        match reconcile_selection(self.selected_policy.as_ref(), available) {
            Reconciled::Unchanged => false,
            Reconciled::Replace(policy) => {
                tracing::info!(
                    policy_id = policy.id,
                    name = %policy.name,
                    "policy selection refreshed"
                );
                self.selected_policy = Some(policy);
                true
            }
        }
    }
}

/// Fetch the Connect policies offered in `environment`.
pub async fn connect_policies(environment: Environment) -> Result<Vec<Policy>> {
    let client = KeyringClient::new(KeyringApiConfig::public(environment)?)?;
    client
        .connect_policies()
        .await
        .with_context(|| format!("failed to list public policies for {environment}"))
}

/// Load preferences, reconcile the selection against the live listing, and
/// persist any change. Returns the preferences and the listing.
pub async fn load_reconciled(path: &Path) -> Result<(Preferences, Vec<Policy>)> {
    let mut prefs = Preferences::load(path)?;
    let available = connect_policies(prefs.environment).await?;
    if prefs.reconcile(&available) {
        prefs.save(path)?;
    }
    Ok((prefs, available))
}

/// Arguments for `keyring env`.
#[derive(Args, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommand,
}

/// Environment subcommands.
#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Print the selected environment and its API base URL.
    Show,
    /// Select an environment.
    Set {
        /// `dev` or `prod`.
        environment: Environment,
    },
}

/// Arguments for `keyring policy`.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy selection subcommands.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Print the selected policy after reconciling it with the live listing.
    Show,
    /// Select a policy by backend id.
    Select {
        /// Policy id.
        id: u64,
    },
}

/// Execute `keyring env`.
pub fn run_env(args: &EnvArgs, prefs_path: &Path) -> Result<u8> {
    let mut prefs = Preferences::load(prefs_path)?;
    match &args.command {
        EnvCommand::Show => {
            println!("{} {}", prefs.environment, prefs.environment.api_base_url());
        }
        EnvCommand::Set { environment } => {
            if prefs.environment != *environment {
                prefs.environment = *environment;
                prefs.save(prefs_path)?;
            }
            println!("OK: environment={environment}");
        }
    }
    Ok(0)
}

/// Execute `keyring policy`.
pub async fn run_policy(args: &PolicyArgs, prefs_path: &Path) -> Result<u8> {
    match &args.command {
        PolicyCommand::Show => {
            let (prefs, _) = load_reconciled(prefs_path).await?;
            match &prefs.selected_policy {
                Some(policy) => crate::print_json(policy)?,
                None => println!("no policy available in {}", prefs.environment),
            }
        }
        PolicyCommand::Select { id } => {
            let mut prefs = Preferences::load(prefs_path)?;
            let available = connect_policies(prefs.environment).await?;
            let Some(policy) = available.iter().find(|p| p.id == *id) else {
                let ids: Vec<String> = available.iter().map(|p| p.id.to_string()).collect();
                bail!(
                    "policy {id} is not offered in {} (available: {})",
                    prefs.environment,
                    ids.join(", ")
                );
            };
            prefs.selected_policy = Some(policy.clone());
            prefs.save(prefs_path)?;
            println!("OK: selected policy id={} name={}", policy.id, policy.name);
        }
    }
    Ok(0)
}
