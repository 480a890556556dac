//! Extraction rules: validation, compilation, evaluation and output shaping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sitegrab_core::Error;

use super::query::QueryEngine;

/// How a rule's matches become one output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// First match only.
    Text,
    /// All matches, joined.
    ListText,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "TEXT",
            OutputFormat::ListText => "LIST_TEXT",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("TEXT") {
            Ok(OutputFormat::Text)
        } else if s.eq_ignore_ascii_case("LIST_TEXT") {
            Ok(OutputFormat::ListText)
        } else {
            Err(format!("unsupported output format {s:?} (expected TEXT or LIST_TEXT)"))
        }
    }
}

/// A rule as written in a template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Output field name; must be whitelisted.
    #[serde(default)]
    pub name: String,

    /// Selector expression (XPath or CSS).
    #[serde(default, alias = "xPath", alias = "xpath")]
    pub selector: String,

    /// `TEXT` or `LIST_TEXT`, case-insensitive.
    #[serde(default, alias = "outputFormat")]
    pub output_format: String,
}

impl Rule {
    pub fn new(name: impl Into<String>, selector: impl Into<String>, output_format: impl Into<String>) -> Self {
        Self { name: name.into(), selector: selector.into(), output_format: output_format.into() }
    }

    /// Check the rule against the whitelist and the known output formats.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if:
    /// - name, selector or output format is empty
    /// - name is not in `allowed_names` (case-insensitive)
    /// - output format is neither `TEXT` nor `LIST_TEXT` (case-insensitive)
    pub fn validate(&self, allowed_names: &[String]) -> Result<OutputFormat, Error> {
        let label = if self.name.trim().is_empty() { "<unnamed>" } else { self.name.as_str() };

        if self.name.trim().is_empty() {
            return Err(Error::validation(label, "name must not be empty"));
        }
        if self.selector.trim().is_empty() {
            return Err(Error::validation(label, "selector must not be empty"));
        }
        if self.output_format.trim().is_empty() {
            return Err(Error::validation(label, "output_format must not be empty"));
        }

        if !allowed_names.iter().any(|n| n.eq_ignore_ascii_case(self.name.trim())) {
            return Err(Error::validation(label, format!("unknown rule name (allowed: {})", allowed_names.join(", "))));
        }

        self.output_format.parse().map_err(|reason: String| Error::validation(label, reason))
    }
}

/// A validated rule with its selector compiled by a query engine.
#[derive(Debug, Clone)]
pub struct CompiledRule<S> {
    name: String,
    expr: String,
    format: OutputFormat,
    selector: S,
}

impl<S> CompiledRule<S> {
    /// Validate `rule` and compile its selector exactly once.
    pub fn compile<E>(rule: &Rule, allowed_names: &[String], engine: &E) -> Result<Self, Error>
    where
        E: QueryEngine<Selector = S>,
    {
        let format = rule.validate(allowed_names)?;
        let selector = engine.compile(rule.selector.trim())?;

        Ok(Self { name: rule.name.trim().to_string(), expr: rule.selector.trim().to_string(), format, selector })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selector expression as written.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Raw values of every match in `document`.
    pub fn evaluate<E>(&self, engine: &E, document: &E::Document) -> Result<Vec<String>, Error>
    where
        E: QueryEngine<Selector = S>,
    {
        engine.evaluate(&self.selector, document)
    }

    /// Evaluate and shape into one field.
    ///
    /// An evaluation failure is logged and yields an empty field.
    pub fn extract<E>(&self, engine: &E, document: &E::Document, separator: &str) -> String
    where
        E: QueryEngine<Selector = S>,
    {
        match self.evaluate(engine, document) {
            Ok(values) => shape(&values, self.format, separator),
            Err(e) => {
                tracing::warn!(rule = %self.name, selector = %self.expr, error = %e, "rule evaluation failed; leaving field empty");
                String::new()
            }
        }
    }
}

/// Shape matched values into a single tabular field.
///
/// No matches yield an empty string. Newlines and tabs inside a value are
/// collapsed to single spaces and the value is trimmed.
pub fn shape(values: &[String], format: OutputFormat, separator: &str) -> String {
    match format {
        OutputFormat::Text => values.first().map(|v| flatten(v)).unwrap_or_default(),
        OutputFormat::ListText => values.iter().map(|v| flatten(v)).collect::<Vec<_>>().join(separator),
    }
}

/// Collapses each run of `\n`, `\r`, `\t` into one space and trims the ends.
///
/// Deliberately stricter than a per-character replacement without trimming:
/// indentation inside markup would otherwise leak into the fields.
fn flatten(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;

    for c in value.chars() {
        if matches!(c, '\n' | '\r' | '\t') {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    out.trim().to_string()
}
