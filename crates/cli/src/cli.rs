//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sitegrab_core::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "sitegrab",
    about = "Extract fields from web pages using a per-site template, caching fetched HTML on disk",
    version,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// YAML template file.
    #[arg(short, long, required = true)]
    pub template: Option<PathBuf>,

    /// File with one URL per line. Blank lines and `#` comments are skipped.
    #[arg(short, long, required = true)]
    pub urls: Option<PathBuf>,

    /// TOML configuration file (overrides SITEGRAB_CONFIG_FILE).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cache folder.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the document cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Never retry without certificate validation.
    #[arg(long)]
    pub no_insecure_fallback: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Store a local HTML file in the cache under a URL.
    CachePut {
        /// URL the document is cached for.
        url: String,

        /// HTML file to store.
        file: PathBuf,
    },
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if self.no_cache {
            config.cache_enabled = false;
        }
        if self.no_insecure_fallback {
            config.insecure_fallback = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_arguments() {
        assert!(Cli::try_parse_from(["sitegrab", "--template", "t.yaml"]).is_err());
        let cli = Cli::try_parse_from(["sitegrab", "-t", "t.yaml", "-u", "urls.txt"]).unwrap();
        assert_eq!(cli.template, Some(PathBuf::from("t.yaml")));
        assert_eq!(cli.urls, Some(PathBuf::from("urls.txt")));
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cache_put_subcommand() {
        let cli = Cli::try_parse_from([
            "sitegrab",
            "--cache-dir",
            "/tmp/pages",
            "cache-put",
            "https://example.com/product/42",
            "page.html",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::CachePut { url: "https://example.com/product/42".into(), file: PathBuf::from("page.html") })
        );
        assert!(cli.template.is_none());
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/pages")));

        assert!(Cli::try_parse_from(["sitegrab", "cache-put", "https://example.com/"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "sitegrab",
            "-t",
            "t.yaml",
            "-u",
            "urls.txt",
            "--cache-dir",
            "/tmp/pages",
            "--no-cache",
            "--no-insecure-fallback",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/pages"));
        assert!(!config.cache_enabled);
        assert!(!config.insecure_fallback);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let cli = Cli::try_parse_from(["sitegrab", "-t", "t.yaml", "-u", "urls.txt"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert!(config.cache_enabled);
        assert!(config.insecure_fallback);
        assert_eq!(config.cache_dir, AppConfig::default().cache_dir);
    }
}
