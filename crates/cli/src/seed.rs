//! Manual cache seeding.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sitegrab_core::DocumentStore;

/// Store the contents of `file` in `store` under `url`.
///
/// The key is derived from `url` exactly as the extraction run derives it, so
/// a later run finds the entry without touching the network.
pub fn cache_put(store: &DocumentStore, url: &str, file: &Path) -> Result<PathBuf> {
    let url = url.trim();
    if url.is_empty() {
        bail!("URL must not be empty");
    }
    if !store.is_enabled() {
        bail!("the document cache is disabled or unavailable");
    }

    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let path = store.try_store(url, &bytes).with_context(|| format!("failed to cache {url}"))?;

    tracing::info!(url, path = %path.display(), bytes = bytes.len(), "seeded cache entry");
    Ok(path)
}
