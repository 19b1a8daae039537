//! # Prove Subcommand
//!
//! End-to-end credential issuance for one wallet:
//!
//! 1. Resolve the policy (explicit `--policy-id` or the reconciled selection).
//! 2. Generate the authorisation proof with the snarkjs process backend.
//! 3. Exchange proof and public signals for the issuer's blinded signature.
//! 4. Unblind, verify, and print the `createCredential` calldata together
//!    with the ABI-encoded transaction for the environment's contract.
//!
//! Nothing is submitted on-chain; the output is meant for a wallet or
//! signer to send.
//!
//! ## Message Encoding
//!
//! The orchestrator is built with the default
//! [`ReferenceScheme`](keyring_zkpg::ReferenceScheme). Its message digest
//! and circuit input names are a development placeholder and do not match
//! the production AuthorisationConstruction circuit, so the live backend
//! rejects the resulting proofs. Use this command against a local issuer
//! and artifacts built for the same encoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use keyring_client::{BlindedSignatureRequest, KeyringApiConfig, KeyringClient};
use keyring_core::abi::encode_create_credential;
use keyring_core::{CredentialUpdateCalldata, Environment, EvmAddress, KeyringZkpgInput, Policy};
use keyring_zkpg::SnarkjsBackend;
use serde::Serialize;

use crate::preferences::load_reconciled;
use crate::RuntimeOptions;

/// Arguments for `keyring prove`.
#[derive(Args, Debug)]
pub struct ProveArgs {
    /// Wallet the credential is issued to.
    #[arg(long)]
    pub wallet: EvmAddress,
    /// Target chain id.
    #[arg(long)]
    pub chain_id: u64,
    /// Backend user id the proof is submitted for.
    #[arg(long)]
    pub user_id: String,
    /// Policy id; defaults to the persisted selection.
    #[arg(long)]
    pub policy_id: Option<u64>,
    /// Path to the snarkjs executable.
    #[arg(long, value_name = "PATH", default_value = "snarkjs")]
    pub snarkjs: PathBuf,
}

/// Transaction to submit to the credential contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTransaction {
    /// Credential contract, when deployed on the chain.
    pub to: Option<EvmAddress>,
    /// ABI-encoded `createCredential` call.
    pub data: String,
    /// Fee to attach, in the chain's native unit.
    pub value: u64,
}

/// Printed result of `keyring prove`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveReport {
    /// Environment the credential targets.
    pub environment: Environment,
    /// Decoded `createCredential` arguments.
    pub calldata: CredentialUpdateCalldata,
    /// Ready-to-sign transaction.
    pub transaction: CredentialTransaction,
}

/// Pick the policy to prove for.
pub fn resolve_policy(
    requested: Option<u64>,
    selected: Option<&Policy>,
    available: &[Policy],
) -> Result<Policy> {
    match requested {
        Some(id) => match available.iter().find(|p| p.id == id) {
            Some(policy) => Ok(policy.clone()),
            None => bail!("policy {id} is not offered as a Connect policy"),
        },
        None => selected
            .cloned()
            .context("no policy selected; run `keyring policy select <id>` or pass --policy-id"),
    }
}

/// Assemble the printable report from verified calldata.
pub fn build_report(
    environment: Environment,
    calldata: CredentialUpdateCalldata,
) -> Result<ProveReport> {
    let data =
        encode_create_credential(&calldata).context("failed to ABI-encode createCredential")?;
    let to = environment.credential_contract(calldata.chain_id);
    if to.is_none() {
        tracing::warn!(
            chain_id = calldata.chain_id,
            %environment,
            "no credential contract known for chain"
        );
    }
    Ok(ProveReport {
        environment,
        transaction: CredentialTransaction {
            to,
            data,
            value: calldata.cost,
        },
        calldata,
    })
}

/// Execute `keyring prove`.
pub async fn run_prove(args: &ProveArgs, prefs_path: &Path, opts: &RuntimeOptions) -> Result<u8> {
    let (prefs, available) = load_reconciled(prefs_path).await?;
    let policy = resolve_policy(args.policy_id, prefs.selected_policy.as_ref(), &available)?;
    let backend_policy_id = policy.id;
    let input = KeyringZkpgInput {
        trading_wallet: args.wallet.clone(),
        policy,
        chain_id: args.chain_id,
    };

    let zkpg = crate::orchestrator(Arc::new(SnarkjsBackend::new(&args.snarkjs)), opts)?;
    let output = zkpg
        .generate_proof(&input)
        .await
        .context("proof generation failed")?;
    tracing::info!(
        wallet = %input.trading_wallet,
        policy_id = backend_policy_id,
        "proof generated"
    );

    let config = KeyringApiConfig::from_env().context("Keyring API configuration")?;
    let client = KeyringClient::new(config)?;
    let request = BlindedSignatureRequest {
        proof: serde_json::to_value(&output.proof).context("failed to serialize proof")?,
        public_signals: output.public_signals.clone(),
    };
    let signed = client
        .blinded_signature(&args.user_id, backend_policy_id, &request)
        .await
        .context("blinded signature request failed")?;

    let calldata = zkpg
        .create_credential_update_calldata(&signed.blinded_signature, &input, &output)
        .context("blinded signature rejected")?;
    crate::print_json(&build_report(prefs.environment, calldata)?)?;
    Ok(0)
}
