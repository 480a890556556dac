//! Cache-first document resolution.
//!
//! Per URL:
//! 1. Cache hit: parse the cached bytes and stop.
//! 2. Fetch with certificate validation; on success parse, cache, return.
//! 3. On a TLS validation failure only, retry once without validation.
//! 4. Anything else is logged and the URL is skipped.
//!
//! Nothing escapes `resolve`: callers get a document or `None`.

use bytes::Bytes;
use sitegrab_core::{DocumentStore, Error};

use super::{Fetcher, TlsMode};
use crate::extract::QueryEngine;

/// Where a resolved document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
    /// Fetched after certificate validation failed and was disabled.
    InsecureNetwork,
}

/// A parsed document and its origin.
#[derive(Debug)]
pub struct Resolved<D> {
    pub document: D,
    pub source: Source,
}

/// Resolves URLs to parsed documents through the document store and a fetcher.
pub struct FetchOrchestrator<F, E> {
    fetcher: F,
    engine: E,
    store: DocumentStore,
    insecure_fallback: bool,
}

impl<F, E> FetchOrchestrator<F, E>
where
    F: Fetcher,
    E: QueryEngine,
{
    pub fn new(fetcher: F, engine: E, store: DocumentStore) -> Self {
        Self { fetcher, engine, store, insecure_fallback: true }
    }

    /// Enable or disable the unverified retry after a TLS failure.
    pub fn with_insecure_fallback(mut self, enabled: bool) -> Self {
        self.insecure_fallback = enabled;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Resolve `url` to a parsed document, or `None` if it must be skipped.
    pub async fn resolve(&self, url: &str) -> Option<Resolved<E::Document>> {
        if let Some(bytes) = self.store.lookup(url) {
            return match self.engine.parse(&bytes) {
                Ok(document) => Some(Resolved { document, source: Source::Cache }),
                Err(e) => {
                    tracing::warn!(url, error = %e, "cached document could not be parsed; skipping URL");
                    None
                }
            };
        }

        let (bytes, source) = match self.download(url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(url, error = %e, "fetch failed; skipping URL");
                return None;
            }
        };

        let document = match self.engine.parse(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(url, error = %e, "fetched document could not be parsed; skipping URL");
                return None;
            }
        };

        self.store.store(url, &bytes);

        Some(Resolved { document, source })
    }

    async fn download(&self, url: &str) -> Result<(Bytes, Source), Error> {
        match self.fetcher.fetch(url, TlsMode::Verify).await {
            Ok(bytes) => Ok((bytes, Source::Network)),
            Err(e) if e.is_tls() && self.insecure_fallback => {
                tracing::warn!(url, error = %e, "certificate validation failed; retrying WITHOUT certificate validation");
                let bytes = self.fetcher.fetch(url, TlsMode::AcceptInvalid).await?;
                Ok((bytes, Source::InsecureNetwork))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use sitegrab_core::StoreConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::extract::HtmlEngine;
    use crate::extract::query::fake::FakeEngine;
    use crate::fetch::{FetchClient, FetchConfig};

    /// Fetcher replaying canned results and recording every attempt.
    #[derive(Default)]
    struct ScriptedFetcher {
        results: Mutex<VecDeque<Result<Bytes, Error>>>,
        calls: Mutex<Vec<TlsMode>>,
    }

    impl ScriptedFetcher {
        fn new(results: impl IntoIterator<Item = Result<Bytes, Error>>) -> Self {
            Self { results: Mutex::new(results.into_iter().collect()), calls: Mutex::default() }
        }

        fn calls(&self) -> Vec<TlsMode> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str, tls: TlsMode) -> Result<Bytes, Error> {
            self.calls.lock().unwrap().push(tls);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::HttpError("no scripted response".into())))
        }
    }

    const URL: &str = "https://example.com/product/42";

    fn doc(body: &str) -> Result<Bytes, Error> {
        Ok(Bytes::from(body.to_string()))
    }

    fn tls_failure() -> Result<Bytes, Error> {
        Err(Error::Tls("invalid peer certificate: UnknownIssuer".into()))
    }

    fn store_in(dir: &std::path::Path) -> DocumentStore {
        DocumentStore::initialize(&StoreConfig { dir: dir.to_path_buf(), enabled: true })
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.store(URL, b"title=Cached");

        let fetcher = ScriptedFetcher::default();
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store);

        let resolved = orchestrator.resolve(URL).await.unwrap();
        assert_eq!(resolved.source, Source::Cache);
        assert_eq!(resolved.document["title"], vec!["Cached"]);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_miss_fetches_and_populates_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new([doc("title=Fresh")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store_in(tmp.path()));

        let first = orchestrator.resolve(URL).await.unwrap();
        assert_eq!(first.source, Source::Network);
        assert_eq!(orchestrator.store().lookup(URL).unwrap(), b"title=Fresh");

        let second = orchestrator.resolve(URL).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.document, first.document);
        assert_eq!(fetcher.calls(), vec![TlsMode::Verify]);
    }

    #[tokio::test]
    async fn test_tls_failure_retries_once_without_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new([tls_failure(), doc("title=Insecure")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store_in(tmp.path()));

        let resolved = orchestrator.resolve(URL).await.unwrap();
        assert_eq!(resolved.source, Source::InsecureNetwork);
        assert_eq!(resolved.document["title"], vec!["Insecure"]);
        assert_eq!(fetcher.calls(), vec![TlsMode::Verify, TlsMode::AcceptInvalid]);
        assert!(orchestrator.store().lookup(URL).is_some());
    }

    /// Layer recording the level and message of every event.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<Mutex<Vec<(tracing::Level, String)>>>);

    impl Captured {
        fn at(&self, level: tracing::Level) -> Vec<String> {
            self.0.lock().unwrap().iter().filter(|(l, _)| *l == level).map(|(_, m)| m.clone()).collect()
        }
    }

    struct Message(String);

    impl tracing::field::Visit for Message {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Captured {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let mut message = Message(String::new());
            event.record(&mut message);
            self.0.lock().unwrap().push((*event.metadata().level(), message.0));
        }
    }

    #[tokio::test]
    async fn test_insecure_retry_warns_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = Captured::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));

        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new([tls_failure(), doc("title=Insecure")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store_in(tmp.path()));

        let resolved = orchestrator.resolve(URL).await.unwrap();
        assert_eq!(resolved.source, Source::InsecureNetwork);

        let warnings = captured.at(tracing::Level::WARN);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("WITHOUT certificate validation"));
    }

    #[tokio::test]
    async fn test_verified_fetch_does_not_warn() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = Captured::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));

        let fetcher = ScriptedFetcher::new([doc("title=Fresh")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, DocumentStore::disabled());

        assert!(orchestrator.resolve(URL).await.is_some());
        assert!(captured.at(tracing::Level::WARN).is_empty());
    }

    #[tokio::test]
    async fn test_tls_failure_without_fallback_skips() {
        let fetcher = ScriptedFetcher::new([tls_failure(), doc("title=never")]);
        let orchestrator =
            FetchOrchestrator::new(&fetcher, FakeEngine, DocumentStore::disabled()).with_insecure_fallback(false);

        assert!(orchestrator.resolve(URL).await.is_none());
        assert_eq!(fetcher.calls(), vec![TlsMode::Verify]);
    }

    #[tokio::test]
    async fn test_tls_failure_on_retry_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new([tls_failure(), tls_failure()]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store_in(tmp.path()));

        assert!(orchestrator.resolve(URL).await.is_none());
        assert_eq!(fetcher.calls().len(), 2);
        assert!(orchestrator.store().lookup(URL).is_none());
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        for failure in [
            Error::HttpError("status 503".into()),
            Error::InvalidUrl("empty URL".into()),
            Error::FetchTimeout("operation timed out".into()),
        ] {
            let fetcher = ScriptedFetcher::new([Err(failure), doc("title=never")]);
            let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, DocumentStore::disabled());

            assert!(orchestrator.resolve(URL).await.is_none());
            assert_eq!(fetcher.calls(), vec![TlsMode::Verify]);
        }
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::new([doc("")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, store_in(tmp.path()));

        assert!(orchestrator.resolve(URL).await.is_none());
        assert!(orchestrator.store().lookup(URL).is_none());
    }

    #[tokio::test]
    async fn test_disabled_store_always_fetches() {
        let fetcher = ScriptedFetcher::new([doc("title=a"), doc("title=b")]);
        let orchestrator = FetchOrchestrator::new(&fetcher, FakeEngine, DocumentStore::disabled());

        assert_eq!(orchestrator.resolve(URL).await.unwrap().source, Source::Network);
        assert_eq!(orchestrator.resolve(URL).await.unwrap().document["title"], vec!["b"]);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_http_fetch_through_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/42"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html><title>Widget</title></html>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let orchestrator = FetchOrchestrator::new(client, HtmlEngine, store_in(tmp.path()));
        let url = format!("{}/product/42", server.uri());

        let title = HtmlEngine.compile("//title").unwrap();
        for expected in [Source::Network, Source::Cache] {
            let resolved = orchestrator.resolve(&url).await.unwrap();
            assert_eq!(resolved.source, expected);
            assert_eq!(HtmlEngine.evaluate(&title, &resolved.document).unwrap(), vec!["Widget"]);
        }
    }
}
