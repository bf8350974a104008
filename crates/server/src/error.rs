//! Structured errors for the cwg-view server.
//!
//! Every error renders as an HTML page with a matching status code.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use cwgview_core::Error;

use crate::render;

/// Structured errors for the cwg-view server.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Error raised by the cache or fetcher.
    #[error(transparent)]
    Cache(#[from] Error),

    /// The path does not name a page.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Cache(Error::NoSuchIssue(_)) | WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Cache(Error::NotYetAvailable) => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Cache(Error::UpstreamUnreachable(_) | Error::UpstreamNotParseable(_)) => StatusCode::BAD_GATEWAY,
            WebError::Cache(Error::InvalidUrl(_) | Error::HttpClient(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let page = match &self {
            WebError::Cache(Error::NoSuchIssue(id)) => render::no_such_issue(id),
            WebError::Cache(Error::NotYetAvailable) => render::not_yet_available(),
            WebError::Cache(Error::UpstreamUnreachable(failure)) => render::upstream_unreachable(failure),
            WebError::Cache(Error::UpstreamNotParseable(failure)) => render::upstream_not_parseable(failure),
            WebError::Cache(err @ (Error::InvalidUrl(_) | Error::HttpClient(_))) => {
                tracing::error!(error = %err, "request failed");
                render::internal_error(&err.to_string())
            }
            WebError::NotFound(path) => render::not_found(path),
        };

        (status, Html(page)).into_response()
    }
}
