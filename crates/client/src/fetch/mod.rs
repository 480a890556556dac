//! HTTP fetch pipeline with cache-first resolution.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Only http/https with a host, fragments removed
//!
//! ### Transport
//! - Two clients built up front: certificate-verifying and non-verifying
//! - Max redirects: 5, max body bytes: 5MB (configurable)
//! - Failures classified as TLS, timeout, oversize or generic HTTP errors
//!
//! ### Orchestration
//! - Cache lookup first, then verified fetch, then (on TLS failure only) one
//!   unverified retry. Successful network fetches populate the cache.

pub mod orchestrator;
pub mod url;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use orchestrator::{FetchOrchestrator, Resolved, Source};
pub use self::url::{UrlError, canonicalize};

use sitegrab_core::{AppConfig, Error};

/// Whether the server certificate is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Verify,
    AcceptInvalid,
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sitegrab/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "sitegrab/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The canonicalized URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Source of raw document bytes.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, tls: TlsMode) -> Result<Bytes, Error>;
}

#[async_trait::async_trait]
impl<T: Fetcher + ?Sized> Fetcher for &T {
    async fn fetch(&self, url: &str, tls: TlsMode) -> Result<Bytes, Error> {
        (**self).fetch(url, tls).await
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    secure: Client,
    insecure: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let secure = Self::build_client(&config, TlsMode::Verify)?;
        let insecure = Self::build_client(&config, TlsMode::AcceptInvalid)?;

        Ok(Self { secure, insecure, config })
    }

    fn build_client(config: &FetchConfig, tls: TlsMode) -> Result<Client, Error> {
        Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .danger_accept_invalid_certs(tls == TlsMode::AcceptInvalid)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))
    }

    /// Fetch a URL, returning raw bytes and metadata.
    pub async fn fetch_response(&self, url_str: &str, tls: TlsMode) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(url_str)?;

        let client = match tls {
            TlsMode::Verify => &self.secure,
            TlsMode::AcceptInvalid => &self.insecure,
        };

        let response = client
            .get(url.as_str())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(classify)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes, {:?})",
            url,
            final_url,
            fetch_ms,
            bytes.len(),
            tls
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &str, tls: TlsMode) -> Result<Bytes, Error> {
        Ok(self.fetch_response(url, tls).await?.bytes)
    }
}

/// Map a transport error onto the error taxonomy.
fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else if is_certificate_error(&err) {
        Error::Tls(error_chain(&err))
    } else {
        Error::HttpError(format!("network error: {}", error_chain(&err)))
    }
}

/// Whether any error in the source chain reports a certificate problem.
fn is_certificate_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_ascii_lowercase();
        if message.contains("certificate") || message.contains("unknownissuer") || message.contains("self signed") {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
