//! Artifact storage
//!
//! Generated PNGs live behind the [`ArtifactStore`] trait so the service can
//! run against a directory on disk or an in-memory map, and so per-session
//! namespacing can be added without touching the handlers.
//!
//! Keys are derived from email addresses by percent-encoding every byte
//! outside `[A-Za-z0-9@._+-]`. The mapping is injective and reversible, so a
//! stored file name always identifies exactly one email address.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Result};

/// File extension of every stored artifact
pub const ARTIFACT_EXTENSION: &str = "png";

/// Bytes left verbatim in a key; everything else (including `%`) is escaped
const KEY_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-');

/// Filesystem-safe storage key for one email address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Derive the key for an email address
    pub fn from_email(email: &str) -> Self {
        Self(utf8_percent_encode(email, KEY_ESCAPE_SET).to_string())
    }

    /// Parse an existing key, accepting only the canonical encoded form
    ///
    /// Rejects empty keys, `.`/`..`, separators, and escapes that are not
    /// what [`ArtifactKey::from_email`] would have produced.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw == "." || raw == ".." {
            return Err(Error::InvalidKey(raw.to_string()));
        }

        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| Error::InvalidKey(raw.to_string()))?;

        let canonical = Self::from_email(&decoded);
        if canonical.0 != raw {
            return Err(Error::InvalidKey(raw.to_string()));
        }
        Ok(canonical)
    }

    /// Parse a stored file name (`<key>.png`)
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let stem = file_name
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| Error::InvalidKey(file_name.to_string()))?;
        Self::parse(stem)
    }

    /// The email address this key was derived from
    pub fn email(&self) -> String {
        // Keys are only constructed from valid UTF-8, so decoding is lossless
        percent_decode_str(&self.0).decode_utf8_lossy().into_owned()
    }

    /// Stored file name, also used as the archive entry name
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, ARTIFACT_EXTENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored file, named as it is on disk and inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Storage seam for generated artifacts
///
/// Implementations must be safe to share between request handlers. Callers
/// that need a consistent view across several calls (archive then clear)
/// serialize through their own lock.
pub trait ArtifactStore: Send + Sync {
    /// Store (or overwrite) the bytes for `key`
    fn store(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()>;

    /// All stored keys, sorted by key
    fn list(&self) -> Result<Vec<ArtifactKey>>;

    /// Bytes for `key`, or `None` when absent
    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;

    /// Every stored file, sorted by file name
    ///
    /// Unlike [`ArtifactStore::list`] this includes files whose names are not
    /// canonical keys. It covers exactly what [`ArtifactStore::delete_all`]
    /// removes.
    fn entries(&self) -> Result<Vec<StoredFile>>;

    /// Delete every stored artifact, returning how many were removed
    ///
    /// Stops at the first error.
    fn delete_all(&self) -> Result<usize>;
}

/// Artifacts stored as `<key>.png` files in one directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, creating the directory if missing
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            info!("Creating output directory: {}", root.display());
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// PNG files in the root, including ones whose names are not canonical keys
    fn png_entries(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == ARTIFACT_EXTENSION);
            if is_png && entry.file_type()?.is_file() {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl ArtifactStore for DirectoryStore {
    fn store(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, bytes)?;
        debug!("Stored artifact {}", path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ArtifactKey>> {
        let mut keys: Vec<ArtifactKey> = self
            .png_entries()?
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| ArtifactKey::from_file_name(name).ok())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn entries(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        for path in self.png_entries()? {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            match fs::read(&path) {
                Ok(bytes) => files.push(StoredFile { file_name, bytes }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} disappeared while reading", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }

    fn delete_all(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.png_entries()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        info!("Removed {} artifacts from {}", removed, self.root.display());
        Ok(removed)
    }
}

/// In-process store, used by tests and for ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: RwLock<BTreeMap<ArtifactKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("memory store lock poisoned".to_string())
}

impl ArtifactStore for MemoryStore {
    fn store(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        self.artifacts
            .write()
            .map_err(poisoned)?
            .insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ArtifactKey>> {
        Ok(self.artifacts.read().map_err(poisoned)?.keys().cloned().collect())
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
        Ok(self.artifacts.read().map_err(poisoned)?.get(key).cloned())
    }

    fn entries(&self) -> Result<Vec<StoredFile>> {
        Ok(self
            .artifacts
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|(key, bytes)| StoredFile {
                file_name: key.file_name(),
                bytes: bytes.clone(),
            })
            .collect())
    }

    fn delete_all(&self) -> Result<usize> {
        let mut artifacts = self.artifacts.write().map_err(poisoned)?;
        let removed = artifacts.len();
        artifacts.clear();
        Ok(removed)
    }
}
