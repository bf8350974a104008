//! Unified error types for cwg-view.
//!
//! The `Display` output of every variant starts with a stable uppercase code
//! so log lines and error pages can be matched on without parsing prose.

use std::fmt;

/// Diagnostics captured from a failed upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// The URL that was requested.
    pub url: String,
    /// HTTP status code, or `None` when no response headers arrived.
    pub status: Option<u16>,
    /// Response body as received (empty for transport failures).
    pub body: String,
    /// Transport error text when no response was received.
    pub reason: Option<String>,
}

impl UpstreamFailure {
    /// Failure for a response that arrived but was rejected.
    pub fn from_response(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self { url: url.into(), status: Some(status), body: body.into(), reason: None }
    }

    /// Failure for a request that never produced a response.
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { url: url.into(), status: None, body: String::new(), reason: Some(reason.into()) }
    }

    /// At most the first `max_chars` characters of the body.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.body.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.body[..idx],
            None => &self.body,
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.reason) {
            (Some(status), None) => write!(f, "{} returned status {}", self.url, status),
            (Some(status), Some(reason)) => write!(f, "{} returned status {}: {}", self.url, status, reason),
            (None, Some(reason)) => write!(f, "{}: {}", self.url, reason),
            (None, None) => write!(f, "{}: no response", self.url),
        }
    }
}

/// Unified error types for the cwg-view service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Transport failure or any status other than 200.
    #[error("UPSTREAM_UNREACHABLE: {0}")]
    UpstreamUnreachable(UpstreamFailure),

    /// Status 200, but the body is not the expected HTML document.
    #[error("UPSTREAM_NOT_PARSEABLE: {0}")]
    UpstreamNotParseable(UpstreamFailure),

    /// The identifier is not present in the current snapshot.
    #[error("NO_SUCH_ISSUE: {0}")]
    NoSuchIssue(String),

    /// No snapshot has ever been captured.
    #[error("NOT_YET_AVAILABLE: no upstream document has been fetched yet")]
    NotYetAvailable,

    /// A configured URL could not be used.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP_CLIENT: {0}")]
    HttpClient(String),
}
