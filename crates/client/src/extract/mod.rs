//! Template-driven field extraction.
//!
//! ### Query Engine
//! - Selector compilation and document parsing sit behind the `QueryEngine` trait.
//! - `HtmlEngine` implements it with `scraper`; CSS selectors are used as-is and
//!   XPath location paths are translated to CSS first.
//!
//! ### Rules
//! - A rule names one output field, a selector expression and an output format.
//! - Rules are validated against the rule-name whitelist and compiled once.
//!
//! ### Templates
//! - A template scopes an ordered rule list to URLs matching a regular expression.
//! - Applying a template to a matching URL always yields `1 + rules` fields.

pub mod html;
pub mod query;
pub mod rule;
pub mod template;
pub mod xpath;

pub use html::{HtmlEngine, HtmlQuery};
pub use query::QueryEngine;
pub use rule::{CompiledRule, OutputFormat, Rule, shape};
pub use template::{Template, TemplateSpec};
pub use xpath::NodeValue;
