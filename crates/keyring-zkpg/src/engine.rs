//! # Proof-Generation Orchestrator
//!
//! [`KeyringZkpg`] ties the pieces together: it prefetches and caches the
//! proving artifacts, builds the authorisation witness, drives the proving
//! backend and finally turns the issuer's blind signature into
//! `createCredential` calldata.
//!
//! ## Ownership
//!
//! The recommended entry point is [`KeyringZkpg::new`] (or
//! [`KeyringZkpg::start`] to prefetch immediately), with the caller owning
//! the returned value and sharing it by `Arc`. [`KeyringZkpg::get_instance`]
//! provides a process-wide, first-call-wins instance for callers that want
//! one.
//!
//! ## Authorisation Scheme
//!
//! The message digest and circuit input layout come from the
//! [`AuthorisationScheme`] in [`KeyringZkpgOptions::scheme`]. The default
//! [`ReferenceScheme`] is a development placeholder that does not
//! interoperate with the production circuit; see [`crate::scheme`].
//!
//! ## Security Invariant
//!
//! Calldata is only produced after the unblinded signature verifies
//! against the authorisation message digest. A signature for any other
//! message fails with [`ZkpgError::InvalidBlindedSignature`].

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use keyring_core::bigint::{bytes_to_hex, parse_decimal, to_decimal};
use keyring_core::temporal::valid_until_secs;
use keyring_core::{
    CredentialUpdateCalldata, KeyringZkpgConfig, KeyringZkpgConfigOverrides, KeyringZkpgInput,
};
use keyring_crypto::{CryptoError, EcCryptoSuite, PolicyRegimes, RegimeKey, RsaPublicKey};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use tokio::sync::watch;

use crate::artifacts::HttpArtifactSource;
use crate::backend::ProvingBackend;
use crate::circuit::{AuthorisationWitness, CircuitSetup, Groth16Proof, WitnessRequest};
use crate::clock::{resolve_now_ms, HttpServerClock, LocalClock, ServerClock};
use crate::error::{ArtifactError, ZkpgError};
use crate::fetch::ArtifactFetcher;
use crate::scheme::{AuthorisationScheme, ReferenceScheme};
use crate::status::{StatusKind, StatusMachine, ZkpgStatus};
use crate::storage::ArtifactStorage;

static INSTANCE: OnceLock<Arc<KeyringZkpg>> = OnceLock::new();

/// Construction options.
#[derive(Debug, Clone, Default)]
pub struct KeyringZkpgOptions {
    /// Log every step at `info` instead of `debug`.
    pub debug: bool,
    /// Skip the server time request and use buffered local time.
    pub use_local_time: bool,
    /// Partial configuration overrides.
    pub config: KeyringZkpgConfigOverrides,
    /// Artifact cache root. Defaults to [`crate::storage::default_root`].
    pub cache_dir: Option<PathBuf>,
    /// Message digest and input layout. Defaults to [`ReferenceScheme`].
    pub scheme: Option<Arc<dyn AuthorisationScheme>>,
}

/// Result of [`KeyringZkpg::generate_proof`].
#[derive(Debug)]
pub struct KeyringZkpgOutput {
    /// Proof with `0x` hex coordinates.
    pub proof: Groth16Proof,
    /// Public signals, decimal strings.
    pub public_signals: Vec<String>,
    /// Secrets needed to finish the credential.
    pub witness: AuthorisationWitness,
}

impl KeyringZkpgOutput {
    /// The blinded message to submit for signing, as a decimal string.
    pub fn blinded_message(&self) -> String {
        to_decimal(self.witness.blinded_message().value())
    }
}

/// Releases a proof slot in the status machine, even if the proving
/// future is dropped.
struct ProofSlot<'a> {
    status: &'a Mutex<StatusMachine>,
    done: bool,
}

impl ProofSlot<'_> {
    fn finish(mut self, outcome: Result<(), String>) {
        self.done = true;
        self.status.lock().complete_proof(outcome);
    }
}

impl Drop for ProofSlot<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.status
                .lock()
                .complete_proof(Err("proof generation abandoned".to_string()));
        }
    }
}

/// The proof-generation orchestrator.
pub struct KeyringZkpg {
    suite: Arc<dyn EcCryptoSuite>,
    scheme: Arc<dyn AuthorisationScheme>,
    backend: Arc<dyn ProvingBackend>,
    config: KeyringZkpgConfig,
    debug: bool,
    fetcher: ArtifactFetcher,
    status: Mutex<StatusMachine>,
    server_clock: Option<Arc<dyn ServerClock>>,
    local_clock: LocalClock,
}

impl std::fmt::Debug for KeyringZkpg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringZkpg")
            .field("suite", &self.suite.name())
            .field("scheme", &self.scheme.name())
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("status", self.status.lock().current())
            .finish_non_exhaustive()
    }
}

impl KeyringZkpg {
    /// Orchestrator with the default configuration plus `options.config`.
    pub fn new(
        suite: Arc<dyn EcCryptoSuite>,
        backend: Arc<dyn ProvingBackend>,
        options: KeyringZkpgOptions,
    ) -> Self {
        Self::with_config(KeyringZkpgConfig::default(), suite, backend, options)
    }

    /// Orchestrator with `base` plus `options.config`.
    pub fn with_config(
        base: KeyringZkpgConfig,
        suite: Arc<dyn EcCryptoSuite>,
        backend: Arc<dyn ProvingBackend>,
        options: KeyringZkpgOptions,
    ) -> Self {
        let config = base.with_overrides(options.config);
        let scheme: Arc<dyn AuthorisationScheme> = match options.scheme {
            Some(scheme) => scheme,
            None => Arc::new(ReferenceScheme),
        };
        let client = reqwest::Client::new();
        let storage = Arc::new(match options.cache_dir {
            Some(dir) => ArtifactStorage::new(dir),
            None => ArtifactStorage::open_default(),
        });
        let source = Arc::new(HttpArtifactSource::with_client(client.clone()));
        let fetcher = ArtifactFetcher::new(storage, source, config.zk_artifacts.clone());
        let server_clock: Option<Arc<dyn ServerClock>> = if options.use_local_time {
            None
        } else {
            Some(Arc::new(HttpServerClock::new(
                client,
                config.server_time_endpoint.clone(),
            )))
        };
        tracing::debug!(
            suite = suite.name(),
            scheme = scheme.name(),
            backend = backend.name(),
            use_local_time = options.use_local_time,
            "keyring-zkpg constructed"
        );
        Self {
            local_clock: LocalClock::new(config.time_buffer_ms),
            suite,
            scheme,
            backend,
            config,
            debug: options.debug,
            fetcher,
            status: Mutex::new(StatusMachine::new()),
            server_clock,
        }
    }

    /// Construct and begin prefetching on the current tokio runtime.
    ///
    /// Outside a runtime no prefetch is started; the first proof request
    /// loads the artifacts instead.
    pub fn start(
        suite: Arc<dyn EcCryptoSuite>,
        backend: Arc<dyn ProvingBackend>,
        options: KeyringZkpgOptions,
    ) -> Arc<Self> {
        let zkpg = Arc::new(Self::new(suite, backend, options));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = zkpg.clone();
                handle.spawn(async move {
                    if let Err(e) = task.prefetch().await {
                        tracing::warn!(error = %e, "background artifact prefetch failed");
                    }
                });
            }
            Err(_) => tracing::debug!("no tokio runtime, skipping background prefetch"),
        }
        zkpg
    }

    /// The process-wide instance, created by the first call.
    ///
    /// Arguments of later calls are ignored.
    pub fn get_instance(
        suite: Arc<dyn EcCryptoSuite>,
        backend: Arc<dyn ProvingBackend>,
        options: KeyringZkpgOptions,
    ) -> Arc<Self> {
        let mut created = false;
        let instance = INSTANCE.get_or_init(|| {
            created = true;
            Self::start(suite, backend, options)
        });
        if !created {
            tracing::debug!("returning existing keyring-zkpg instance");
        }
        instance.clone()
    }

    /// Effective configuration.
    pub fn config(&self) -> &KeyringZkpgConfig {
        &self.config
    }

    /// The persistent artifact cache.
    pub fn storage(&self) -> &Arc<ArtifactStorage> {
        self.fetcher.storage()
    }

    /// Number of network download batches started so far.
    pub fn download_batches(&self) -> u64 {
        self.fetcher.download_batches()
    }

    /// Current status.
    pub fn status(&self) -> ZkpgStatus {
        self.status.lock().current().clone()
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<ZkpgStatus> {
        self.status.lock().subscribe()
    }

    fn step(&self, message: &str) {
        if self.debug {
            tracing::info!(step = message, "keyring-zkpg");
        } else {
            tracing::debug!(step = message, "keyring-zkpg");
        }
    }

    /// Load the proving artifacts from cache or network.
    ///
    /// Joins a prefetch already in progress. Settles to `idle` on success
    /// if no proof started meanwhile, or to `error` on failure.
    pub async fn prefetch(&self) -> Result<(), ZkpgError> {
        let entered = self.status.lock().transition(ZkpgStatus::PrefetchingFiles).is_ok();
        self.step("prefetching artifacts");
        match self.fetcher.fetch().await {
            Ok(artifacts) => {
                if entered {
                    self.status
                        .lock()
                        .transition_if(StatusKind::PrefetchingFiles, ZkpgStatus::Idle);
                }
                tracing::info!(bytes = artifacts.byte_len(), "ZK artifacts ready");
                Ok(())
            }
            Err(ArtifactError::Cancelled) => Err(ArtifactError::Cancelled.into()),
            Err(e) => {
                let err = ZkpgError::from(e);
                tracing::error!(error = %err, "artifact prefetch failed");
                self.status.lock().transition_if(
                    StatusKind::PrefetchingFiles,
                    ZkpgStatus::Error {
                        reason: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Generate the authorisation proof for `input`.
    ///
    /// The proof and blinded message follow the configured
    /// [`AuthorisationScheme`]. With the default [`ReferenceScheme`] they
    /// are only accepted by the mock backend and matching local issuers.
    pub async fn generate_proof(
        &self,
        input: &KeyringZkpgInput,
    ) -> Result<KeyringZkpgOutput, ZkpgError> {
        self.status.lock().begin_proof()?;
        let slot = ProofSlot {
            status: &self.status,
            done: false,
        };
        let result = self.prove(input).await;
        match &result {
            Ok(_) => slot.finish(Ok(())),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    wallet = %input.trading_wallet,
                    "proof generation failed"
                );
                slot.finish(Err(e.to_string()));
            }
        }
        result
    }

    async fn prove(&self, input: &KeyringZkpgInput) -> Result<KeyringZkpgOutput, ZkpgError> {
        input.validate()?;
        let suite = self.suite.as_ref();
        let policy = &input.policy;
        let policy_id = policy.onchain_policy_id();
        let key = RsaPublicKey::from_schema(policy.require_public_key()?)?;
        let regime = RegimeKey::from_schema(policy.require_regime_key()?, suite)?;
        let cost = policy
            .cost_for_chain(input.chain_id)
            .ok_or(ZkpgError::UnsupportedChain {
                policy_id,
                chain_id: input.chain_id,
            })?;

        self.step("resolving server time");
        let now_ms = resolve_now_ms(self.server_clock.as_deref(), &self.local_clock).await;
        let valid_until = valid_until_secs(now_ms, policy.duration);

        self.step("building witness");
        let witness = AuthorisationWitness::build(
            suite,
            self.scheme.as_ref(),
            WitnessRequest {
                trader: input.trading_wallet.clone(),
                policy_id,
                chain_id: input.chain_id,
                valid_until,
                cost,
                key,
                regimes: PolicyRegimes::single(regime),
            },
            &mut OsRng,
        )?;
        let inputs = self.scheme.circuit_inputs(&witness, suite);

        self.step("loading circuit setup");
        let setup = CircuitSetup::new(self.fetcher.fetch().await?);

        self.step("running full prove");
        let output = self
            .backend
            .full_prove(&setup, &inputs)
            .await?
            .ok_or(ZkpgError::EmptyProof)?;

        let expected = to_decimal(witness.blinded_message().value());
        let index = self.scheme.blinded_message_signal();
        match output.public_signals.get(index) {
            Some(signal) if *signal == expected => {}
            other => {
                return Err(ZkpgError::OutputMismatch(format!(
                    "public signal {index} is {other:?}, expected the blinded message"
                )))
            }
        }

        let proof = output.proof.hexlify()?;
        tracing::info!(
            policy_id,
            chain_id = input.chain_id,
            valid_until,
            circuit = %setup.fingerprint(),
            "authorisation proof generated"
        );
        Ok(KeyringZkpgOutput {
            proof,
            public_signals: output.public_signals,
            witness,
        })
    }

    /// Unblind and verify `blinded_signature`, then build the calldata.
    pub fn create_credential_update_calldata(
        &self,
        blinded_signature: &str,
        input: &KeyringZkpgInput,
        output: &KeyringZkpgOutput,
    ) -> Result<CredentialUpdateCalldata, ZkpgError> {
        let message = output.witness.message();
        if message.trader != input.trading_wallet
            || message.chain_id != input.chain_id
            || message.policy_id != input.policy.onchain_policy_id()
        {
            return Err(ZkpgError::OutputMismatch(
                "proof output was generated for a different wallet, chain or policy".to_string(),
            ));
        }

        let key = &message.key;
        let blinded = key.element(parse_decimal("blindedSignature", blinded_signature)?)?;
        let signature = key
            .unblind_verified(
                output.witness.digest(),
                &blinded,
                output.witness.blinding_factor(),
            )
            .map_err(|e| match e {
                CryptoError::VerificationFailed => {
                    tracing::warn!(
                        wallet = %message.trader,
                        "blinded signature failed verification"
                    );
                    ZkpgError::InvalidBlindedSignature
                }
                other => other.into(),
            })?;

        Ok(CredentialUpdateCalldata {
            trader: message.trader.clone(),
            policy_id: message.policy_id,
            chain_id: message.chain_id,
            valid_until: message.valid_until,
            cost: message.cost,
            key: key.modulus_hex(),
            signature: signature.to_padded_hex(key)?,
            backdoor: bytes_to_hex(&message.backdoor),
        })
    }

    /// Abort any in-flight artifact fetch and reset to `idle`.
    ///
    /// The persistent cache is left untouched.
    pub fn cleanup(&self) {
        let cancelled = self.fetcher.cancel();
        self.status.lock().reset();
        tracing::info!(cancelled_fetch = cancelled, "keyring-zkpg cleaned up");
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backend::MockProvingBackend;
    use keyring_crypto::BabyJubJub;

    fn zkpg(dir: &std::path::Path) -> KeyringZkpg {
        KeyringZkpg::new(
            Arc::new(BabyJubJub::new()),
            Arc::new(MockProvingBackend::new()),
            KeyringZkpgOptions {
                use_local_time: true,
                cache_dir: Some(dir.to_path_buf()),
                config: KeyringZkpgConfigOverrides {
                    zk_artifacts: Some(
                        KeyringZkpgConfig::local_mock("http://127.0.0.1:9").zk_artifacts,
                    ),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(zkpg(dir.path()).status(), ZkpgStatus::Idle);
    }

    #[tokio::test]
    async fn unreachable_cdn_moves_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let zkpg = zkpg(dir.path());
        let err = zkpg.prefetch().await.unwrap_err();
        assert!(err.to_string().starts_with("failed to load ZK artifacts"));
        assert!(zkpg.status().is_error());

        zkpg.cleanup();
        assert_eq!(zkpg.status(), ZkpgStatus::Idle);
    }

    #[test]
    fn abandoned_proof_releases_its_slot() {
        let status = Mutex::new(StatusMachine::new());
        status.lock().begin_proof().unwrap();
        drop(ProofSlot {
            status: &status,
            done: false,
        });
        assert!(status.lock().current().is_error());
    }
}
