//! End-to-end orchestrator tests against a mock CDN and time endpoint.

use std::sync::Arc;
use std::time::Duration;

use keyring_core::abi::encode_create_credential;
use keyring_core::bigint::to_decimal;
use keyring_core::{
    ArtifactUrls, EvmAddress, KeyringZkpgConfig, KeyringZkpgConfigOverrides, KeyringZkpgInput,
    Policy, PublicKeySchema, RegimeKeySchema,
};
use keyring_crypto::{BabyJubJub, CryptoError, EcCryptoSuite, RsaPrivateKey};
use keyring_zkpg::{
    KeyringZkpg, KeyringZkpgOptions, MockProvingBackend, ProvingBackend, ZkpgError, ZkpgStatus,
};
use num_bigint::BigUint;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `Tue, 14 Nov 2023 22:13:20 GMT` in unix seconds.
const SERVER_SECS: u64 = 1_700_000_000;
const SERVER_DATE: &str = "Tue, 14 Nov 2023 22:13:20 GMT";

fn issuer() -> RsaPrivateKey {
    let p = (BigUint::from(1u8) << 61) - 1u8;
    let q = (BigUint::from(1u8) << 89) - 1u8;
    RsaPrivateKey::from_primes(&p, &q, BigUint::from(65_537u32)).unwrap()
}

fn policy(issuer: &RsaPrivateKey) -> Policy {
    let regime = BabyJubJub::new().base_point();
    Policy {
        id: 7,
        onchain_id: None,
        name: "Connect".into(),
        duration: 3600,
        cost: Some(100),
        costs: None,
        public_key: Some(PublicKeySchema {
            n: to_decimal(issuer.public_key().modulus()),
            e: "65537".into(),
        }),
        regime_key: Some(RegimeKeySchema {
            x: regime.x.to_string(),
            y: regime.y.to_string(),
        }),
        policy_type: None,
    }
}

fn input(issuer: &RsaPrivateKey) -> KeyringZkpgInput {
    KeyringZkpgInput {
        trading_wallet: EvmAddress::new("0xABC0000000000000000000000000000000000123").unwrap(),
        policy: policy(issuer),
        chain_id: 1,
    }
}

fn urls(server: &MockServer) -> ArtifactUrls {
    KeyringZkpgConfig::local_mock(&server.uri()).zk_artifacts
}

/// Mount the three artifacts, each expected exactly `times` times.
async fn mount_artifacts(server: &MockServer, times: u64) {
    mount_artifacts_expecting(server, [times; 3]).await;
}

/// Mount z-key, wasm and symbol map with per-file expectations.
async fn mount_artifacts_expecting(server: &MockServer, times: [u64; 3]) {
    let files = [
        (
            "/AuthorisationConstruction.01.zKey",
            ResponseTemplate::new(200).set_body_bytes(b"zkey-bytes".to_vec()),
        ),
        (
            "/AuthorisationConstruction.wasm",
            ResponseTemplate::new(200).set_body_bytes(b"\0asm".to_vec()),
        ),
        (
            "/AuthorisationConstruction.public.sym.json",
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"main.blindedMessage": 1})),
        ),
    ];
    for ((file, response), times) in files.into_iter().zip(times) {
        Mock::given(method("GET"))
            .and(path(file))
            .respond_with(response)
            .expect(times)
            .mount(server)
            .await;
    }
}

async fn mount_time(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/policies/public"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Date", SERVER_DATE)
                .set_body_json(serde_json::json!([])),
        )
        .mount(server)
        .await;
}

fn zkpg(
    server: &MockServer,
    cache: &std::path::Path,
    backend: Arc<dyn ProvingBackend>,
) -> KeyringZkpg {
    KeyringZkpg::new(
        Arc::new(BabyJubJub::new()),
        backend,
        KeyringZkpgOptions {
            cache_dir: Some(cache.to_path_buf()),
            config: KeyringZkpgConfigOverrides {
                server_time_endpoint: Some(format!("{}/api/v1/policies/public", server.uri())),
                zk_artifacts: Some(urls(server)),
                time_buffer_ms: None,
            },
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn connect_policy_scenario_produces_verified_calldata() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();
    let input = input(&issuer);

    let output = zkpg.generate_proof(&input).await.unwrap();
    assert_eq!(zkpg.status(), ZkpgStatus::ProofsReady);
    assert!(!output.public_signals.is_empty());
    assert_eq!(output.public_signals[0], output.blinded_message());
    assert!(output.proof.pi_a.iter().all(|c| c.starts_with("0x")));
    assert_eq!(output.proof.pi_b.len(), 3);

    let blinded_sig = issuer.sign(output.witness.blinded_message());
    let calldata = zkpg
        .create_credential_update_calldata(&to_decimal(blinded_sig.value()), &input, &output)
        .unwrap();
    assert_eq!(calldata.valid_until, SERVER_SECS + 3600);
    assert_eq!(calldata.cost, 100);
    assert_eq!(calldata.policy_id, 7);
    assert_eq!(calldata.chain_id, 1);
    assert_eq!(calldata.trader, input.trading_wallet);
    assert_eq!(calldata.key, issuer.public_key().modulus_hex());
    assert_eq!(calldata.signature.len(), 2 + 2 * issuer.public_key().byte_len());
    assert_eq!(calldata.backdoor.len(), 2 + 2 * 5 * 128);

    let tx = encode_create_credential(&calldata).unwrap();
    assert!(tx.starts_with("0x"));
}

#[tokio::test]
async fn concurrent_proofs_share_one_download() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();
    let input = input(&issuer);

    let (prefetch, a, b) = tokio::join!(
        zkpg.prefetch(),
        zkpg.generate_proof(&input),
        zkpg.generate_proof(&input)
    );
    prefetch.unwrap();
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.blinded_message(), b.blinded_message());
    assert_eq!(zkpg.download_batches(), 1);
    assert_eq!(zkpg.status(), ZkpgStatus::ProofsReady);
}

#[tokio::test]
async fn cached_artifacts_survive_a_new_instance() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let backend: Arc<dyn ProvingBackend> = Arc::new(MockProvingBackend::new());

    zkpg(&server, cache.path(), backend.clone()).prefetch().await.unwrap();
    let second = zkpg(&server, cache.path(), backend);
    second.prefetch().await.unwrap();
    assert_eq!(second.download_batches(), 0);
    assert_eq!(second.status(), ZkpgStatus::Idle);
}

#[tokio::test]
async fn cleanup_cancels_fetch_and_next_proof_refetches() {
    let server = MockServer::start().await;
    // The first z-key request hangs long enough to be cancelled.
    Mock::given(method("GET"))
        .and(path("/AuthorisationConstruction.01.zKey"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Wasm and symbol map are fetched by both attempts.
    mount_artifacts_expecting(&server, [1, 2, 2]).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = Arc::new(zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new())));

    let pending = tokio::spawn({
        let zkpg = zkpg.clone();
        async move { zkpg.prefetch().await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(zkpg.status(), ZkpgStatus::PrefetchingFiles);

    zkpg.cleanup();
    assert_eq!(zkpg.status(), ZkpgStatus::Idle);
    let err = pending.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("cancelled"));
    assert_eq!(zkpg.status(), ZkpgStatus::Idle);

    let issuer = issuer();
    zkpg.generate_proof(&input(&issuer)).await.unwrap();
    assert_eq!(zkpg.download_batches(), 2);
}

#[tokio::test]
async fn failing_artifact_fails_the_batch_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/AuthorisationConstruction.wasm"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));

    let err = zkpg.prefetch().await.unwrap_err();
    assert!(matches!(err, ZkpgError::Artifacts(_)));
    assert!(err.to_string().contains("HTTP 503"));
    assert!(zkpg.status().is_error());
    assert_eq!(zkpg.storage().get_artifact().await.unwrap(), None);

    let issuer = issuer();
    let err = zkpg.generate_proof(&input(&issuer)).await.unwrap_err();
    assert!(matches!(err, ZkpgError::Artifacts(_)));
    assert!(zkpg.status().is_error());
}

#[tokio::test]
async fn mismatched_signature_is_rejected() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();
    let input = input(&issuer);
    let output = zkpg.generate_proof(&input).await.unwrap();

    // Signature over a different message.
    let other = issuer.public_key().reduce(&BigUint::from(12_345u32));
    let wrong = issuer.sign(&other);
    let err = zkpg
        .create_credential_update_calldata(&to_decimal(wrong.value()), &input, &output)
        .unwrap_err();
    assert!(matches!(err, ZkpgError::InvalidBlindedSignature));
    assert_eq!(err.to_string(), "Invalid blinded signature");

    let err = zkpg
        .create_credential_update_calldata("not-a-number", &input, &output)
        .unwrap_err();
    assert!(matches!(err, ZkpgError::Validation(_)));

    let mut other_input = input.clone();
    other_input.chain_id = 137;
    let sig = issuer.sign(output.witness.blinded_message());
    let err = zkpg
        .create_credential_update_calldata(&to_decimal(sig.value()), &other_input, &output)
        .unwrap_err();
    assert!(matches!(err, ZkpgError::OutputMismatch(_)));
}

#[tokio::test]
async fn wallet_spelling_does_not_matter_for_calldata() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();

    let mut checksummed = input(&issuer);
    checksummed.trading_wallet =
        EvmAddress::new("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
    let output = zkpg.generate_proof(&checksummed).await.unwrap();

    let mut lowercase = checksummed.clone();
    lowercase.trading_wallet =
        EvmAddress::new("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
    let sig = issuer.sign(output.witness.blinded_message());
    let calldata = zkpg
        .create_credential_update_calldata(&to_decimal(sig.value()), &lowercase, &output)
        .unwrap();
    assert_eq!(calldata.trader, lowercase.trading_wallet);
    assert_eq!(calldata.trader.as_str(), checksummed.trading_wallet.as_str());
}

#[tokio::test]
async fn off_curve_regime_key_fails_before_any_download() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 0).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();

    let mut off_curve = input(&issuer);
    off_curve.policy.regime_key = Some(RegimeKeySchema {
        x: "1".into(),
        y: "2".into(),
    });
    let err = zkpg.generate_proof(&off_curve).await.unwrap_err();
    assert!(matches!(err, ZkpgError::Crypto(CryptoError::InvalidPoint(_))));
    assert!(zkpg.status().is_error());
    assert_eq!(zkpg.download_batches(), 0);
}

#[tokio::test]
async fn empty_prover_output_is_an_error() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    mount_time(&server).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::empty()));
    let issuer = issuer();

    let err = zkpg.generate_proof(&input(&issuer)).await.unwrap_err();
    assert!(matches!(err, ZkpgError::EmptyProof));
    assert_eq!(
        zkpg.status(),
        ZkpgStatus::Error {
            reason: "failed to generate circuit proof".into()
        }
    );
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_download() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 0).await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = zkpg(&server, cache.path(), Arc::new(MockProvingBackend::new()));
    let issuer = issuer();

    let mut no_key = input(&issuer);
    no_key.policy.public_key = None;
    assert!(matches!(
        zkpg.generate_proof(&no_key).await.unwrap_err(),
        ZkpgError::Validation(_)
    ));

    let mut wrong_chain = input(&issuer);
    wrong_chain.policy.cost = None;
    assert!(matches!(
        zkpg.generate_proof(&wrong_chain).await.unwrap_err(),
        ZkpgError::UnsupportedChain { policy_id: 7, chain_id: 1 }
    ));
    assert!(zkpg.status().is_error());
}

#[tokio::test]
async fn local_time_skips_the_time_endpoint() {
    let server = MockServer::start().await;
    mount_artifacts(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/policies/public"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let zkpg = KeyringZkpg::new(
        Arc::new(BabyJubJub::new()),
        Arc::new(MockProvingBackend::new()),
        KeyringZkpgOptions {
            use_local_time: true,
            cache_dir: Some(cache.path().to_path_buf()),
            config: KeyringZkpgConfigOverrides {
                server_time_endpoint: Some(format!("{}/api/v1/policies/public", server.uri())),
                zk_artifacts: Some(urls(&server)),
                time_buffer_ms: Some(60_000),
            },
            ..Default::default()
        },
    );
    let issuer = issuer();
    let before = keyring_core::temporal::now_ms() / 1000;
    let output = zkpg.generate_proof(&input(&issuer)).await.unwrap();
    let valid_until = output.witness.message().valid_until;
    assert!(valid_until <= before + 3600 - 59);
    assert!(valid_until >= before + 3600 - 62);
}

#[test]
fn first_instance_wins() {
    let cache = tempfile::tempdir().unwrap();
    let options = |debug| KeyringZkpgOptions {
        debug,
        cache_dir: Some(cache.path().to_path_buf()),
        ..Default::default()
    };
    let a = KeyringZkpg::get_instance(
        Arc::new(BabyJubJub::new()),
        Arc::new(MockProvingBackend::new()),
        options(false),
    );
    let b = KeyringZkpg::get_instance(
        Arc::new(BabyJubJub::new()),
        Arc::new(MockProvingBackend::empty()),
        options(true),
    );
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.storage().root(), cache.path());
}
