//! Core types and shared functionality for sitegrab.
//!
//! This crate provides:
//! - Content-addressed HTML document store on the local filesystem
//! - Unified error types
//! - Configuration structures, including the rule-name whitelist

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{DocumentStore, KeyPolicy, Sha256LengthKey, StoreConfig};
pub use config::{AppConfig, ConfigError, RuleNames};
pub use error::Error;
