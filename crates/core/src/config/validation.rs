//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `list_separator` is empty
    /// - `cache_dir` is empty while caching is enabled
    /// - the default rule-name whitelist is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.list_separator.is_empty() {
            return Err(ConfigError::Invalid { field: "list_separator".into(), reason: "must not be empty".into() });
        }

        if self.cache_enabled && self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "cache_dir".into(),
                reason: "must not be empty when caching is enabled".into(),
            });
        }

        if self.rule_names.default.is_empty() {
            return Err(ConfigError::Invalid {
                field: "rule_names.default".into(),
                reason: "whitelist must name at least one rule".into(),
            });
        }

        if self.list_separator.contains(['\t', '\n']) {
            tracing::warn!(
                separator = ?self.list_separator,
                "list_separator contains tab or newline; LIST_TEXT fields will break tabular output"
            );
        }

        Ok(())
    }
}
