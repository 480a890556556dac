//! Filesystem-backed cache for fetched HTML documents.
//!
//! This module provides a persistent, content-addressed document store.
//! It supports:
//!
//! - Content-addressed file names using a pluggable key policy (SHA-256 + length by default)
//! - Atomic payload writes
//! - An append-only `.table` audit log mapping keys back to URLs
//! - Fail-open initialization: an unusable folder yields a disabled store
//!
//! Entries are never updated in place by age and never evicted.

pub mod hash;
pub mod store;

pub use crate::Error;

pub use hash::{KeyPolicy, Sha256LengthKey, compute_cache_key};
pub use store::{AUDIT_FILE, DocumentStore, StoreConfig};
