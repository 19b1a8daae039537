//! # Artifact Storage
//!
//! Durable cache for the proving artifacts, which are too large to refetch
//! for every proof.
//!
//! ## Layout
//!
//! ```text
//! {root}/v{STORAGE_VERSION}/{ARTIFACT_KEY}/
//!     circuit.zkey
//!     circuit.wasm
//!     symbols.json
//!     manifest.json     SHA-256 digest and length of each file
//! ```
//!
//! A single constant key holds a single generation. There is no eviction;
//! bumping [`STORAGE_VERSION`] or calling [`ArtifactStorage::clear`]
//! invalidates the cache.
//!
//! ## Integrity Invariant
//!
//! Bundles are written into a staging directory and renamed into place, and
//! the manifest is written last. A reader therefore sees either a complete
//! bundle or none. Every file is re-hashed on read; a mismatch is reported
//! as [`StorageError::Corrupt`].
//!
//! The staging directory is a [`tempfile::TempDir`], so a store that fails
//! or whose future is dropped midway removes its own scratch files.
//!
//! ## Initialisation
//!
//! Creating the versioned root is asynchronous and memoised. Every public
//! operation awaits it first, so calls issued before setup completes queue
//! behind it. Setup also removes `.staging-*` directories left behind by a
//! process that died mid-store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use crate::artifacts::ZkArtifacts;
use crate::error::StorageError;

/// On-disk format version. Bump to invalidate every existing cache.
pub const STORAGE_VERSION: u32 = 1;

/// Key of the single cached bundle.
pub const ARTIFACT_KEY: &str = "AUTHORISATION_CONSTRUCTION";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "KEYRING_ZKPG_CACHE_DIR";

const ZKEY_FILE: &str = "circuit.zkey";
const WASM_FILE: &str = "circuit.wasm";
const SYMBOLS_FILE: &str = "symbols.json";
const MANIFEST_FILE: &str = "manifest.json";
const STAGING_PREFIX: &str = ".staging-";

/// Digest and length of one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Length in bytes.
    pub len: u64,
}

impl FileEntry {
    fn of(bytes: &[u8]) -> Self {
        Self {
            sha256: hex::encode(Sha256::digest(bytes)),
            len: bytes.len() as u64,
        }
    }
}

/// Integrity manifest of a stored bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Storage format version the bundle was written with.
    pub version: u32,
    /// Bundle key.
    pub key: String,
    /// Proving key entry.
    pub z_key: FileEntry,
    /// Wasm entry.
    pub wasm: FileEntry,
    /// Symbol map entry.
    pub symbol_map: FileEntry,
    /// When the bundle was stored (RFC 3339).
    pub stored_at: String,
}

/// Filesystem-backed artifact cache.
#[derive(Debug)]
pub struct ArtifactStorage {
    root: PathBuf,
    ready: OnceCell<PathBuf>,
}

impl ArtifactStorage {
    /// Storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: OnceCell::new(),
        }
    }

    /// Storage at [`default_root`].
    pub fn open_default() -> Self {
        Self::new(default_root())
    }

    /// Configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the cached bundle.
    pub fn bundle_dir(&self) -> PathBuf {
        self.version_dir().join(ARTIFACT_KEY)
    }

    fn version_dir(&self) -> PathBuf {
        self.root.join(format!("v{STORAGE_VERSION}"))
    }

    async fn init(&self) -> Result<&Path, StorageError> {
        let dir = self
            .ready
            .get_or_try_init(|| async {
                let dir = self.version_dir();
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| StorageError::io(&dir, e))?;
                let swept = sweep_staging(&dir).await?;
                tracing::debug!(dir = %dir.display(), swept, "artifact storage ready");
                Ok::<_, StorageError>(dir)
            })
            .await?;
        Ok(dir.as_path())
    }

    /// Read the cached bundle. `Ok(None)` when nothing is stored.
    pub async fn get_artifact(&self) -> Result<Option<ZkArtifacts>, StorageError> {
        self.init().await?;
        let Some(manifest) = self.manifest().await? else {
            return Ok(None);
        };
        let dir = self.bundle_dir();
        let read = async {
            let z_key = read_verified(&dir, ZKEY_FILE, &manifest.z_key).await?;
            let wasm = read_verified(&dir, WASM_FILE, &manifest.wasm).await?;
            let symbols = read_verified(&dir, SYMBOLS_FILE, &manifest.symbol_map).await?;
            Ok::<_, StorageError>((z_key, wasm, symbols))
        };
        match read.await {
            Ok((z_key, wasm, symbols)) => Ok(Some(ZkArtifacts {
                z_key,
                wasm,
                symbol_map: serde_json::from_slice(&symbols)?,
            })),
            // Bundle replaced between reading the manifest and its files.
            Err(StorageError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Persist `artifacts`, replacing any stored bundle.
    pub async fn store_artifact(&self, artifacts: &ZkArtifacts) -> Result<(), StorageError> {
        let version_dir = self.init().await?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(version_dir)
            .map_err(|e| StorageError::io(version_dir, e))?;
        // Dropping the guard after a successful rename finds nothing to remove.
        self.write_bundle(staging.path(), artifacts).await
    }

    async fn write_bundle(
        &self,
        staging: &Path,
        artifacts: &ZkArtifacts,
    ) -> Result<(), StorageError> {
        let symbols = serde_json::to_vec(&artifacts.symbol_map)?;
        write_file(staging, ZKEY_FILE, &artifacts.z_key).await?;
        write_file(staging, WASM_FILE, &artifacts.wasm).await?;
        write_file(staging, SYMBOLS_FILE, &symbols).await?;

        let manifest = ArtifactManifest {
            version: STORAGE_VERSION,
            key: ARTIFACT_KEY.to_string(),
            z_key: FileEntry::of(&artifacts.z_key),
            wasm: FileEntry::of(&artifacts.wasm),
            symbol_map: FileEntry::of(&symbols),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        write_file(staging, MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?).await?;

        let target = self.bundle_dir();
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&target, e)),
        }
        tokio::fs::rename(staging, &target)
            .await
            .map_err(|e| StorageError::io(&target, e))?;
        tracing::debug!(
            dir = %target.display(),
            bytes = artifacts.byte_len(),
            "artifacts stored"
        );
        Ok(())
    }

    /// Manifest of the stored bundle, if any.
    pub async fn manifest(&self) -> Result<Option<ArtifactManifest>, StorageError> {
        self.init().await?;
        let path = self.bundle_dir().join(MANIFEST_FILE);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        let manifest: ArtifactManifest = serde_json::from_slice(&raw)?;
        if manifest.version != STORAGE_VERSION || manifest.key != ARTIFACT_KEY {
            return Err(StorageError::Corrupt {
                file: MANIFEST_FILE.to_string(),
                reason: format!("unexpected version {} / key {}", manifest.version, manifest.key),
            });
        }
        Ok(Some(manifest))
    }

    /// Delete the stored bundle. Returns whether one existed.
    pub async fn clear(&self) -> Result<bool, StorageError> {
        self.init().await?;
        let target = self.bundle_dir();
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&target, e)),
        }
    }
}

/// Cache root: `$KEYRING_ZKPG_CACHE_DIR`, else the platform cache directory,
/// else `./.keyring-zkpg`.
pub fn default_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .map(|d| d.join("keyring-zkpg"))
        .unwrap_or_else(|| PathBuf::from(".keyring-zkpg"))
}

async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| StorageError::io(&path, e))
}

/// Remove staging directories of interrupted stores. Returns how many went.
async fn sweep_staging(dir: &Path) -> Result<usize, StorageError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StorageError::io(dir, e))?;
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        if !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove stale staging directory"
            ),
        }
    }
    Ok(removed)
}

async fn read_verified(
    dir: &Path,
    name: &str,
    entry: &FileEntry,
) -> Result<Vec<u8>, StorageError> {
    let path = dir.join(name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| StorageError::io(&path, e))?;
    let actual = FileEntry::of(&bytes);
    if actual != *entry {
        return Err(StorageError::Corrupt {
            file: name.to_string(),
            reason: format!(
                "expected {} bytes sha256 {}, found {} bytes sha256 {}",
                entry.len, entry.sha256, actual.len, actual.sha256
            ),
        });
    }
    Ok(bytes)
}
