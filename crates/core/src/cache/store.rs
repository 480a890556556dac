//! Document store operations.
//!
//! One file per URL, named by the key policy, holding the raw HTML bytes.
//! Every insertion also appends `<key> <--> <url>` to the `.table` audit log.
//! The audit log is never read back for lookups.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::hash::{KeyPolicy, Sha256LengthKey};
use crate::{AppConfig, Error};

/// Name of the audit log inside the cache folder.
pub const AUDIT_FILE: &str = ".table";

/// Settings handed to [`DocumentStore::initialize`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cache folder; created if absent.
    pub dir: PathBuf,
    /// When false the store starts disabled without touching the filesystem.
    pub enabled: bool,
}

impl From<&AppConfig> for StoreConfig {
    fn from(config: &AppConfig) -> Self {
        Self { dir: config.cache_dir.clone(), enabled: config.cache_enabled }
    }
}

#[derive(Debug)]
struct Folder {
    dir: PathBuf,
    audit: PathBuf,
}

/// Content-addressed, append-only store of fetched documents.
///
/// A disabled store reports every lookup as a miss and skips every write.
pub struct DocumentStore {
    folder: Option<Folder>,
    policy: Box<dyn KeyPolicy>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").field("folder", &self.folder).finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Open (creating if needed) the cache folder and its audit log.
    ///
    /// Never fails: if the folder or audit log cannot be created the store
    /// comes back disabled and a warning is logged.
    pub fn initialize(config: &StoreConfig) -> Self {
        if !config.enabled {
            tracing::debug!("document cache disabled by configuration");
            return Self::disabled();
        }

        match prepare_folder(&config.dir) {
            Ok(folder) => {
                tracing::debug!(dir = %folder.dir.display(), "document cache ready");
                Self { folder: Some(folder), policy: Box::new(Sha256LengthKey) }
            }
            Err(e) => {
                tracing::warn!(
                    dir = %config.dir.display(),
                    error = %e,
                    "cannot use cache folder; continuing without a document cache"
                );
                Self::disabled()
            }
        }
    }

    /// A store that caches nothing.
    pub fn disabled() -> Self {
        Self { folder: None, policy: Box::new(Sha256LengthKey) }
    }

    /// Replace the key derivation policy.
    pub fn with_policy(mut self, policy: impl KeyPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.folder.is_some()
    }

    /// Cache folder, if enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.folder.as_ref().map(|f| f.dir.as_path())
    }

    /// Cache key for a URL under the current policy.
    pub fn key(&self, url: &str) -> String {
        self.policy.key(url)
    }

    /// Canonical on-disk path for a URL, if enabled.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        self.folder.as_ref().map(|f| f.dir.join(self.key(url)))
    }

    /// Read the cached document for `url`.
    ///
    /// Returns `None` when disabled, when nothing is cached, or when the
    /// entry cannot be read.
    pub fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.path_for(url)?;

        match fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!(url, path = %path.display(), bytes = bytes.len(), "cache hit");
                Some(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(url, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(url, path = %path.display(), error = %e, "failed to read cached document");
                None
            }
        }
    }

    /// Store `bytes` for `url`, logging a warning on failure.
    ///
    /// Returns whether the entry was written. A disabled store skips silently.
    pub fn store(&self, url: &str, bytes: &[u8]) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.try_store(url, bytes) {
            Ok(path) => {
                tracing::debug!(url, path = %path.display(), bytes = bytes.len(), "cached document");
                true
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to cache document");
                false
            }
        }
    }

    /// Write the payload atomically, then append the audit line.
    ///
    /// An existing entry for the same key is replaced. On a disabled store
    /// this is a no-op returning an empty path.
    pub fn try_store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
        let Some(folder) = &self.folder else {
            return Ok(PathBuf::new());
        };

        let key = self.key(url);
        let target = folder.dir.join(&key);

        let mut tmp = NamedTempFile::new_in(&folder.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| Error::Cache(e.error))?;

        let mut audit = OpenOptions::new().create(true).append(true).open(&folder.audit)?;
        writeln!(audit, "{key} <--> {url}")?;
        audit.flush()?;

        Ok(target)
    }
}

fn prepare_folder(dir: &Path) -> Result<Folder, Error> {
    fs::create_dir_all(dir)?;
    let meta = fs::metadata(dir)?;
    if !meta.is_dir() {
        return Err(Error::Cache(io::Error::new(io::ErrorKind::InvalidInput, "cache path is not a directory")));
    }

    let audit = dir.join(AUDIT_FILE);
    OpenOptions::new().create(true).append(true).open(&audit)?;

    Ok(Folder { dir: dir.to_path_buf(), audit })
}
