//! `scraper`-backed query engine.

use scraper::{Html, Selector};
use sitegrab_core::Error;

use super::query::QueryEngine;
use super::xpath::{self, NodeValue};

/// HTML query engine over `scraper`.
///
/// `scraper` documents are not `Send`; parse and evaluate on the thread that
/// owns the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEngine;

/// A compiled selector together with the value it extracts from each match.
#[derive(Debug, Clone)]
pub struct HtmlQuery {
    selector: Selector,
    value: NodeValue,
}

impl HtmlQuery {
    pub fn value(&self) -> &NodeValue {
        &self.value
    }
}

impl QueryEngine for HtmlEngine {
    type Document = Html;
    type Selector = HtmlQuery;

    fn compile(&self, expr: &str) -> Result<HtmlQuery, Error> {
        let (css, value) =
            if xpath::is_xpath(expr) { xpath::translate(expr)? } else { (expr.trim().to_string(), NodeValue::Text) };

        let selector = Selector::parse(&css)
            .map_err(|e| Error::Compilation { selector: expr.to_string(), reason: e.to_string() })?;

        Ok(HtmlQuery { selector, value })
    }

    fn parse(&self, bytes: &[u8]) -> Result<Html, Error> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Err(Error::ParseFailed("document is empty".into()));
        }
        if !text.contains('<') {
            return Err(Error::ParseFailed("document contains no markup".into()));
        }

        Ok(Html::parse_document(&text))
    }

    fn evaluate(&self, query: &HtmlQuery, document: &Html) -> Result<Vec<String>, Error> {
        let values = document
            .select(&query.selector)
            .flat_map(|element| match &query.value {
                NodeValue::Text => vec![element.text().collect::<String>()],
                NodeValue::OwnText => element
                    .children()
                    .filter_map(|child| child.value().as_text().map(|text| String::from(&**text)))
                    .collect(),
                NodeValue::Attr(name) => element.value().attr(name).map(str::to_string).into_iter().collect(),
            })
            .collect();

        Ok(values)
    }
}
