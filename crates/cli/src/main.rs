//! sitegrab entry point.
//!
//! Reads a template and a URL list, resolves each URL through the document
//! cache or the network, and prints one tab-separated row per matching page.
//! Logging goes to stderr so stdout carries only the table.
//!
//! `sitegrab cache-put <url> <file>` stores a local HTML file in the cache
//! instead of running an extraction.

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result, bail};
use clap::Parser;
use sitegrab_client::{FetchClient, FetchConfig, FetchOrchestrator, HtmlEngine, Template, TemplateSpec};
use sitegrab_core::{AppConfig, DocumentStore, StoreConfig};
use tracing_subscriber::EnvFilter;

mod cli;
mod pipeline;
mod seed;
mod urls;

use cli::{Cli, Command};
use pipeline::Pipeline;

const DEFAULT_FILTER: &str = "warn,sitegrab=info,sitegrab_core=info,sitegrab_client=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        return Err(e);
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_with(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if let Some(Command::CachePut { url, file }) = &cli.command {
        let store = DocumentStore::initialize(&StoreConfig::from(&config));
        seed::cache_put(&store, url, file)?;
        return Ok(());
    }

    let (Some(template_path), Some(urls_path)) = (&cli.template, &cli.urls) else {
        bail!("--template and --urls are required");
    };

    let spec = TemplateSpec::from_file(template_path)
        .with_context(|| format!("failed to load template {}", template_path.display()))?;
    let template = Template::load(&spec, &config.rule_names, HtmlEngine)
        .with_context(|| format!("invalid template {}", template_path.display()))?
        .with_separator(config.list_separator.clone());

    let urls =
        urls::read_urls(urls_path).with_context(|| format!("failed to read URL list {}", urls_path.display()))?;

    tracing::info!(template = template.name(), rules = template.rules().len(), urls = urls.len(), "starting run");

    let store = DocumentStore::initialize(&StoreConfig::from(&config));
    let client = FetchClient::new(FetchConfig::from(&config))?;
    let orchestrator =
        FetchOrchestrator::new(client, HtmlEngine, store).with_insecure_fallback(config.insecure_fallback);
    let pipeline = Pipeline::new(orchestrator, template);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = pipeline.run(&urls, &mut out).await.context("failed to write output")?;
    out.flush().context("failed to write output")?;

    tracing::info!(
        processed = summary.processed,
        matched = summary.matched,
        skipped = summary.no_match,
        failed = summary.failed,
        "run complete"
    );

    Ok(())
}
