//! Client code for sitegrab.
//!
//! This crate provides the template/rule extraction engines, the HTML query
//! engine they run on, and the fetch pipeline that resolves a URL to a parsed
//! document through the document cache.

pub mod extract;
pub mod fetch;

pub use extract::{
    CompiledRule, HtmlEngine, HtmlQuery, NodeValue, OutputFormat, QueryEngine, Rule, Template, TemplateSpec, shape,
};

pub use fetch::{FetchClient, FetchConfig, FetchOrchestrator, FetchResponse, Fetcher, Resolved, Source, TlsMode};
