//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITEGRAB_*)
//! 2. TOML config file (explicit path, or SITEGRAB_CONFIG_FILE)
//! 3. Built-in defaults
//!
//! Command-line overrides are applied by the binary after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod rule_names;
mod validation;

pub use rule_names::RuleNames;
pub use validation::ConfigError;

/// Separator joining `LIST_TEXT` values when none is configured.
pub const DEFAULT_LIST_SEPARATOR: &str = ",";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "SITEGRAB_CONFIG_FILE";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITEGRAB_*)
/// 2. TOML config file
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder holding cached documents and the `.table` audit log.
    ///
    /// Set via SITEGRAB_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Whether the document cache is consulted and populated at all.
    ///
    /// Set via SITEGRAB_CACHE_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SITEGRAB_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SITEGRAB_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SITEGRAB_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Retry once without certificate validation when TLS validation fails.
    ///
    /// Set via SITEGRAB_INSECURE_FALLBACK environment variable.
    #[serde(default = "default_true")]
    pub insecure_fallback: bool,

    /// Separator used to join LIST_TEXT values.
    #[serde(default = "default_list_separator")]
    pub list_separator: String,

    /// Rule names a template may use, optionally partitioned by template type.
    #[serde(default)]
    pub rule_names: RuleNames,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_user_agent() -> String {
    "sitegrab/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_list_separator() -> String {
    DEFAULT_LIST_SEPARATOR.into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_enabled: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            insecure_fallback: true,
            list_separator: default_list_separator(),
            rule_names: RuleNames::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from defaults, `SITEGRAB_CONFIG_FILE` and the environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load_with`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration with an optional explicit TOML file.
    ///
    /// An explicit `file` takes the place of `SITEGRAB_CONFIG_FILE`.
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITEGRAB_`
    /// 2. TOML file
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load_with(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::LoadFailed(format!("config file not found: {}", path.display())));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
                    figment = figment.merge(Toml::file(&config_path));
                }
            }
        }

        figment = figment.merge(
            Env::prefixed("SITEGRAB_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
