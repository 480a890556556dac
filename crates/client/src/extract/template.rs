//! Templates: URL-scoped bundles of extraction rules.
//!
//! A template is loaded once, validated completely and compiled before any
//! document is fetched. Any problem is fatal to the run.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sitegrab_core::config::DEFAULT_LIST_SEPARATOR;
use sitegrab_core::{Error, RuleNames};

use super::query::QueryEngine;
use super::rule::{CompiledRule, Rule};

/// Name of the leading output column.
pub const URL_COLUMN: &str = "url";

/// A template as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Regular expression a URL must match.
    #[serde(default)]
    pub pattern: String,

    /// Site domain; must appear in `pattern`, literally or regex-escaped.
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub name: String,

    /// Optional template type selecting a rule-name whitelist.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl TemplateSpec {
    /// Parse a YAML template document.
    pub fn from_yaml(source: &str) -> Result<Self, Error> {
        serde_yaml::from_str(source).map_err(|e| Error::TemplateParse(e.to_string()))
    }

    /// Read and parse a YAML template file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::TemplateParse(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&source)
    }
}

/// A validated template with compiled URL predicate and rules.
pub struct Template<E: QueryEngine> {
    name: String,
    domain: String,
    url_match: Regex,
    rules: Vec<CompiledRule<E::Selector>>,
    separator: String,
    engine: E,
}

impl<E> std::fmt::Debug for Template<E>
where
    E: QueryEngine,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("pattern", &self.url_match.as_str())
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl<E: QueryEngine> Template<E> {
    /// Validate `spec` and compile it with `engine`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTemplate` if:
    /// - `pattern`, `domain` or `name` is empty
    /// - there are no rules
    /// - `pattern` is not a valid regular expression
    /// - `pattern` does not contain `domain`, literally or regex-escaped
    /// - `type` names no whitelist in `names`
    ///
    /// and propagates `Error::Validation` / `Error::Compilation` from the rules.
    pub fn load(spec: &TemplateSpec, names: &RuleNames, engine: E) -> Result<Self, Error> {
        for (field, value) in [("pattern", &spec.pattern), ("domain", &spec.domain), ("name", &spec.name)] {
            if value.trim().is_empty() {
                return Err(Error::InvalidTemplate(format!("{field} must not be empty")));
            }
        }

        if spec.rules.is_empty() {
            return Err(Error::InvalidTemplate(format!("template {:?} declares no rules", spec.name)));
        }

        let url_match = Regex::new(&spec.pattern)
            .map_err(|e| Error::InvalidTemplate(format!("invalid pattern {:?}: {e}", spec.pattern)))?;

        if !pattern_mentions(&spec.pattern, &spec.domain) {
            return Err(Error::InvalidTemplate(format!(
                "domain {:?} does not appear in pattern {:?}",
                spec.domain, spec.pattern
            )));
        }

        let allowed = names.allowed(spec.kind.as_deref())?;
        let rules = spec
            .rules
            .iter()
            .map(|rule| CompiledRule::compile(rule, allowed, &engine))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(template = %spec.name, rules = rules.len(), "template compiled");

        Ok(Self {
            name: spec.name.clone(),
            domain: spec.domain.clone(),
            url_match,
            rules,
            separator: DEFAULT_LIST_SEPARATOR.to_string(),
            engine,
        })
    }

    /// Use `separator` to join `LIST_TEXT` values.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn rules(&self) -> &[CompiledRule<E::Selector>] {
        &self.rules
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Column names: `url` followed by rule names in declaration order.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(URL_COLUMN.to_string())
            .chain(self.rules.iter().map(|r| r.name().to_string()))
            .collect()
    }

    /// Whether `url` is in scope for this template.
    pub fn matches(&self, url: &str) -> bool {
        self.url_match.is_match(url)
    }

    /// Extract one row from `document`.
    ///
    /// Returns `None` when `url` does not match the template. A matching URL
    /// always yields `1 + rules` fields, empty where a rule found nothing or failed.
    pub fn apply(&self, url: &str, document: &E::Document) -> Option<Vec<String>> {
        if !self.matches(url) {
            return None;
        }

        let mut row = Vec::with_capacity(self.rules.len() + 1);
        row.push(url.to_string());
        row.extend(self.rules.iter().map(|rule| rule.extract(&self.engine, document, &self.separator)));
        Some(row)
    }
}

fn pattern_mentions(pattern: &str, domain: &str) -> bool {
    pattern.contains(domain) || pattern.contains(&regex::escape(domain))
}
