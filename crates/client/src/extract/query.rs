//! Narrow capability interface over the HTML parser and selector engine.

use sitegrab_core::Error;

/// Compiles selector expressions, parses documents and evaluates one against the other.
///
/// Compiled selectors must be stateless: evaluating the same selector against
/// any number of documents carries nothing over between calls.
pub trait QueryEngine {
    type Document;
    type Selector;

    /// Compile a selector expression. Failure is a `SELECTOR_COMPILE` error.
    fn compile(&self, expr: &str) -> Result<Self::Selector, Error>;

    /// Parse raw document bytes.
    fn parse(&self, bytes: &[u8]) -> Result<Self::Document, Error>;

    /// Textual values of every node the selector matches, in document order.
    fn evaluate(&self, selector: &Self::Selector, document: &Self::Document) -> Result<Vec<String>, Error>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory engine for tests.
    //!
    //! Documents are `selector=value` lines. Expressions starting with `!`
    //! fail to compile; expressions starting with `?` fail at evaluation.

    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) struct FakeEngine;

    pub(crate) type FakeDocument = BTreeMap<String, Vec<String>>;

    impl QueryEngine for FakeEngine {
        type Document = FakeDocument;
        type Selector = String;

        fn compile(&self, expr: &str) -> Result<String, Error> {
            if expr.starts_with('!') {
                return Err(Error::Compilation { selector: expr.to_string(), reason: "rejected by fake".into() });
            }
            Ok(expr.to_string())
        }

        fn parse(&self, bytes: &[u8]) -> Result<FakeDocument, Error> {
            let text = std::str::from_utf8(bytes).map_err(|e| Error::ParseFailed(e.to_string()))?;
            if text.is_empty() {
                return Err(Error::ParseFailed("empty document".into()));
            }

            let mut doc = FakeDocument::new();
            for line in text.lines() {
                if let Some((selector, value)) = line.split_once('=') {
                    doc.entry(selector.to_string()).or_default().push(value.replace("\\n", "\n").replace("\\t", "\t"));
                }
            }
            Ok(doc)
        }

        fn evaluate(&self, selector: &String, document: &FakeDocument) -> Result<Vec<String>, Error> {
            if selector.starts_with('?') {
                return Err(Error::Evaluation(format!("fake failure for {selector}")));
            }
            Ok(document.get(selector).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_fake_engine_round_trip() {
        let doc = FakeEngine.parse(b"title=Widget\nli=a\nli=b").unwrap();
        assert_eq!(FakeEngine.evaluate(&"li".to_string(), &doc).unwrap(), vec!["a", "b"]);
        assert!(FakeEngine.evaluate(&"missing".to_string(), &doc).unwrap().is_empty());
    }
}
