//! # keyring CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers on
//! a multi-threaded tokio runtime.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keyring_cli::artifacts::{run_artifacts, ArtifactsArgs};
use keyring_cli::policies::{run_policies, PoliciesArgs};
use keyring_cli::preferences::{self, run_env, run_policy, EnvArgs, PolicyArgs};
use keyring_cli::prove::{run_prove, ProveArgs};
use keyring_cli::RuntimeOptions;

/// Keyring Connect CLI
///
/// Generates Keyring Connect credential proofs and manages the artifact
/// cache, environment, and policy selection they depend on.
#[derive(Parser, Debug)]
#[command(name = "keyring", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the preferences file.
    #[arg(long, global = true, value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// Artifact cache directory.
    #[arg(long, global = true, value_name = "DIR", env = "KEYRING_ZKPG_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Use local time (minus the configured buffer) instead of server time.
    #[arg(long, global = true)]
    local_time: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Circuit artifact cache (prefetch, show, clear).
    Artifacts(ArtifactsArgs),

    /// List policies.
    Policies(PoliciesArgs),

    /// Show or select the backend environment.
    Env(EnvArgs),

    /// Show or select the policy used by `prove`.
    Policy(PolicyArgs),

    /// Generate a proof and print the createCredential transaction.
    Prove(ProveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let prefs_path = cli.prefs.clone().unwrap_or_else(preferences::default_path);
    let opts = RuntimeOptions {
        cache_dir: cli.cache_dir.clone(),
        use_local_time: cli.local_time,
        debug: cli.verbose >= 2,
    };
    tracing::debug!(prefs = %prefs_path.display(), "keyring CLI starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Artifacts(args) => run_artifacts(args, &opts).await,
            Commands::Policies(args) => run_policies(args, &prefs_path).await,
            Commands::Env(args) => run_env(args, &prefs_path),
            Commands::Policy(args) => run_policy(args, &prefs_path).await,
            Commands::Prove(args) => run_prove(args, &prefs_path, &opts).await,
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_prove_arguments() {
        let cli = Cli::try_parse_from([
            "keyring",
            "-vv",
            "prove",
            "--wallet",
            "0x00000000000000000000000000000000000000aa",
            "--chain-id",
            "1",
            "--user-id",
            "u-1",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Prove(args) => {
                assert_eq!(args.chain_id, 1);
                assert_eq!(args.policy_id, None);
                assert_eq!(args.snarkjs, PathBuf::from("snarkjs"));
            }
            other => panic!("expected prove, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_environment() {
        assert!(Cli::try_parse_from(["keyring", "env", "set", "staging"]).is_err());
        assert!(Cli::try_parse_from(["keyring", "env", "set", "dev"]).is_ok());
    }

    #[test]
    fn connect_filter_requires_public() {
        assert!(Cli::try_parse_from(["keyring", "policies", "--connect"]).is_err());
        assert!(Cli::try_parse_from(["keyring", "policies", "--public", "--connect"]).is_ok());
    }
}
