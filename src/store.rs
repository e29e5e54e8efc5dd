//! Key/value persistence for per-file artifacts (coordinate indices,
//! bookmarks) and for the viewer configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::util::stable_digest;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("could not resolve the platform {0} directory")]
    NoProjectDir(&'static str),
}

/// Storage port for raw blobs keyed by logical name.
pub trait BlobStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;
    /// Returns [`StoreError::NotFound`] when nothing is stored under `key`.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// JSON files in one directory, one per key.
#[derive(Clone, Debug)]
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "gfascope", "gfascope")
    }

    /// Rooted at the platform data directory (e.g. `~/.local/share/gfascope`).
    pub fn data_dir() -> Result<Self, StoreError> {
        let dirs = Self::project_dirs().ok_or(StoreError::NoProjectDir("data"))?;
        Ok(Self::new(dirs.data_dir()))
    }

    /// Rooted at the platform config directory (e.g. `~/.config/gfascope`).
    pub fn config_dir() -> Result<Self, StoreError> {
        let dirs = Self::project_dirs().ok_or(StoreError::NoProjectDir("config"))?;
        Ok(Self::new(dirs.config_dir()))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl BlobStore for FsStore {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base)?;
        let path = self.path_for(key);
        // Readers must never observe a half-written file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data)?;
        fs::rename(&staging, &path)?;
        debug!(path = %path.display(), bytes = data.len(), "stored blob");
        Ok(())
    }
}

/// Serializing front end over a [`BlobStore`].
#[derive(Clone)]
pub struct Store {
    blobs: Arc<dyn BlobStore>,
}

impl Store {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.blobs.exists(key)
    }

    /// Returns `Ok(None)` if nothing is stored under `key`.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.blobs.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.blobs.save_raw(key, &data)
    }
}

/// Store key for artifacts derived from one source file: the file stem plus a
/// hash of the canonical path, so equally named files in different
/// directories do not collide.
pub fn source_key(source: &Path) -> String {
    let canonical = source
        .canonicalize()
        .unwrap_or_else(|_| source.to_path_buf());
    let stem = canonical
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_owned());
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    format!("{stem}-{}", stable_digest(&canonical.to_string_lossy()))
}
