//! # Artifacts Subcommand
//!
//! Manages the persistent circuit artifact cache shared with proof
//! generation: download ahead of time, inspect the stored manifest, or drop
//! the bundle to force a fresh download.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use keyring_zkpg::storage::{default_root, ArtifactStorage};
use keyring_zkpg::SnarkjsBackend;

use crate::RuntimeOptions;

/// Arguments for the `keyring artifacts` subcommand.
#[derive(Args, Debug)]
pub struct ArtifactsArgs {
    #[command(subcommand)]
    pub command: ArtifactsCommand,
}

/// Artifact cache subcommands.
#[derive(Subcommand, Debug)]
pub enum ArtifactsCommand {
    /// Download the circuit artifacts into the cache unless already stored.
    Prefetch,
    /// Print the manifest of the cached bundle.
    Show,
    /// Delete the cached bundle.
    Clear,
}

/// Execute the artifacts subcommand.
pub async fn run_artifacts(args: &ArtifactsArgs, opts: &RuntimeOptions) -> Result<u8> {
    let root = opts.cache_dir.clone().unwrap_or_else(default_root);
    match &args.command {
        ArtifactsCommand::Prefetch => {
            let zkpg = crate::orchestrator(Arc::new(SnarkjsBackend::default()), opts)?;
            zkpg.prefetch().await.context("artifact prefetch failed")?;
            println!(
                "OK: artifacts cached at {} (downloads={})",
                zkpg.storage().bundle_dir().display(),
                zkpg.download_batches()
            );
            Ok(0)
        }
        ArtifactsCommand::Show => {
            let storage = ArtifactStorage::new(root);
            match storage.manifest().await.context("failed to read artifact manifest")? {
                Some(manifest) => {
                    crate::print_json(&manifest)?;
                    Ok(0)
                }
                None => {
                    println!("NOT FOUND: no artifacts cached under {}", storage.root().display());
                    Ok(1)
                }
            }
        }
        ArtifactsCommand::Clear => {
            let storage = ArtifactStorage::new(root);
            let removed = storage.clear().await.context("failed to clear artifact cache")?;
            if removed {
                println!("OK: cleared {}", storage.bundle_dir().display());
            } else {
                println!("OK: nothing cached under {}", storage.root().display());
            }
            Ok(0)
        }
    }
}
