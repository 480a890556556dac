//! Unified error types for sitegrab.
//!
//! Every variant renders with a stable upper-case code prefix so operator
//! diagnostics can be grepped by failure class.

/// Unified error type shared by the store, the extraction engines and the fetch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Template is structurally invalid (empty fields, bad pattern, no rules).
    #[error("INVALID_TEMPLATE: {0}")]
    InvalidTemplate(String),

    /// Template could not be read or deserialized.
    #[error("INVALID_TEMPLATE: failed to parse template: {0}")]
    TemplateParse(String),

    /// A rule failed validation against the whitelist or format set.
    #[error("INVALID_RULE: {rule}: {reason}")]
    Validation { rule: String, reason: String },

    /// A selector expression could not be compiled by the query engine.
    #[error("SELECTOR_COMPILE: {selector:?}: {reason}")]
    Compilation { selector: String, reason: String },

    /// A compiled selector failed while being evaluated against a document.
    #[error("SELECTOR_EVAL: {0}")]
    Evaluation(String),

    /// Document bytes could not be parsed into a queryable document.
    #[error("PARSE_FAILED: {0}")]
    ParseFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Certificate or TLS handshake validation failed.
    #[error("TLS_ERROR: {0}")]
    Tls(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Cache read or write failed.
    #[error("CACHE_ERROR: {0}")]
    Cache(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must abort the whole run.
    ///
    /// Only template-load failures are fatal; everything else is scoped to
    /// a single URL or field.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidTemplate(_) | Error::TemplateParse(_) | Error::Validation { .. } | Error::Compilation { .. }
        )
    }

    /// Whether this error came from certificate validation.
    pub fn is_tls(&self) -> bool {
        matches!(self, Error::Tls(_))
    }

    /// Build a rule validation error.
    pub fn validation(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation { rule: rule.into(), reason: reason.into() }
    }
}
