//! Content-addressed cache key generation.
//!
//! Keys are derived from the URL string, not the document, so a URL always
//! maps to the same file whether it is being looked up or stored.

use sha2::{Digest, Sha256};

/// Policy deriving a cache file name from a URL.
///
/// Implementations must be pure: the same URL always yields the same key.
pub trait KeyPolicy: Send + Sync {
    fn key(&self, url: &str) -> String;
}

impl<F> KeyPolicy for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn key(&self, url: &str) -> String {
        self(url)
    }
}

/// Lower-hex SHA-256 of the URL followed by `.` and the URL's character count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256LengthKey;

impl KeyPolicy for Sha256LengthKey {
    fn key(&self, url: &str) -> String {
        compute_cache_key(url)
    }
}

/// Compute the default cache key for a URL.
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{}.{}", hex::encode(hasher.finalize()), url.chars().count())
}
