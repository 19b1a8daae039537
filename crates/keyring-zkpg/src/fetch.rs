//! # Single-Flight Artifact Fetch
//!
//! Loads the proving artifacts at most once at a time per fetcher.
//!
//! ## Protocol
//!
//! 1. The first caller creates a shared future tagged with a generation
//!    number and a fresh [`CancellationToken`]. Later callers clone that
//!    future and await the same result.
//! 2. The future consults [`ArtifactStorage`] first. A storage read error
//!    is logged and treated as a miss.
//! 3. On a miss the three files are downloaded concurrently. Any failure
//!    fails the whole batch and nothing is stored.
//! 4. A successful result stays memoised. A failed or cancelled one is
//!    dropped, so the next caller starts from scratch.
//!
//! [`ArtifactFetcher::cancel`] trips the token of the in-flight fetch and
//! forgets it. Pending downloads resolve to [`ArtifactError::Cancelled`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use keyring_core::ArtifactUrls;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::artifacts::{ArtifactSource, ZkArtifacts};
use crate::error::ArtifactError;
use crate::storage::ArtifactStorage;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<ZkArtifacts>, ArtifactError>>>;

struct InFlight {
    generation: u64,
    future: SharedFetch,
    token: CancellationToken,
}

/// Coalesces concurrent artifact loads into one.
pub struct ArtifactFetcher {
    storage: Arc<ArtifactStorage>,
    source: Arc<dyn ArtifactSource>,
    urls: ArtifactUrls,
    inflight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    downloads: Arc<AtomicU64>,
}

impl std::fmt::Debug for ArtifactFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactFetcher")
            .field("storage", &self.storage)
            .field("urls", &self.urls)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ArtifactFetcher {
    /// Fetcher reading through `storage` and downloading from `source`.
    pub fn new(
        storage: Arc<ArtifactStorage>,
        source: Arc<dyn ArtifactSource>,
        urls: ArtifactUrls,
    ) -> Self {
        Self {
            storage,
            source,
            urls,
            inflight: Mutex::new(None),
            generation: AtomicU64::new(0),
            downloads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<ArtifactStorage> {
        &self.storage
    }

    /// Number of network download batches started so far.
    pub fn download_batches(&self) -> u64 {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Whether a fetch is memoised (in flight or completed).
    pub fn is_memoised(&self) -> bool {
        self.inflight.lock().is_some()
    }

    /// Load the artifacts, joining an in-flight or completed fetch.
    pub async fn fetch(&self) -> Result<Arc<ZkArtifacts>, ArtifactError> {
        let (generation, future) = {
            let mut guard = self.inflight.lock();
            match guard.as_ref() {
                Some(inflight) => {
                    tracing::debug!(generation = inflight.generation, "joining artifact fetch");
                    (inflight.generation, inflight.future.clone())
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let token = CancellationToken::new();
                    let future = self.start(token.clone());
                    tracing::debug!(generation, "starting artifact fetch");
                    *guard = Some(InFlight {
                        generation,
                        future: future.clone(),
                        token,
                    });
                    (generation, future)
                }
            }
        };

        let result = future.await;
        if let Err(e) = &result {
            let mut guard = self.inflight.lock();
            if guard.as_ref().is_some_and(|f| f.generation == generation) {
                tracing::debug!(generation, error = %e, "clearing failed artifact fetch");
                *guard = None;
            }
        }
        result
    }

    /// Abort the in-flight fetch, if any, and forget the memo.
    ///
    /// Returns whether a fetch was memoised.
    pub fn cancel(&self) -> bool {
        match self.inflight.lock().take() {
            Some(inflight) => {
                tracing::debug!(generation = inflight.generation, "cancelling artifact fetch");
                inflight.token.cancel();
                true
            }
            None => false,
        }
    }

    fn start(&self, token: CancellationToken) -> SharedFetch {
        let storage = self.storage.clone();
        let source = self.source.clone();
        let urls = self.urls.clone();
        let downloads = self.downloads.clone();
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("artifact fetch was cancelled");
                    Err(ArtifactError::Cancelled)
                }
                result = load(storage, source, urls, downloads) => result.map(Arc::new),
            }
        }
        .boxed()
        .shared()
    }
}

async fn load(
    storage: Arc<ArtifactStorage>,
    source: Arc<dyn ArtifactSource>,
    urls: ArtifactUrls,
    downloads: Arc<AtomicU64>,
) -> Result<ZkArtifacts, ArtifactError> {
    match storage.get_artifact().await {
        Ok(Some(cached)) => {
            tracing::debug!(bytes = cached.byte_len(), "using cached ZK artifacts");
            return Ok(cached);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "failed to read cached ZK artifacts"),
    }

    downloads.fetch_add(1, Ordering::SeqCst);
    tracing::info!(
        z_key = %urls.z_key,
        wasm = %urls.wasm,
        symbol_map = %urls.symbol_map,
        "downloading ZK artifacts"
    );
    let (z_key, wasm, symbol_map) = futures::try_join!(
        source.fetch_bytes(&urls.z_key),
        source.fetch_bytes(&urls.wasm),
        source.fetch_json(&urls.symbol_map),
    )?;
    let artifacts = ZkArtifacts {
        z_key,
        wasm,
        symbol_map,
    };

    match storage.store_artifact(&artifacts).await {
        Ok(()) => tracing::debug!("ZK artifacts cached"),
        Err(e) => tracing::warn!(error = %e, "failed to cache ZK artifacts"),
    }
    Ok(artifacts)
}
