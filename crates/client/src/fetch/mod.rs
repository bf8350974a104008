//! Upstream document fetcher.
//!
//! ### Single Request
//! - One GET per call, no retry. Redirects are followed up to 5 hops.
//! - No timeout unless one is configured.
//!
//! ### Response Validation
//! - Status must be exactly `200 OK`; anything else is `UpstreamUnreachable`.
//! - The body must begin with the literal `<HTML>`; otherwise the upstream
//!   answered with something other than the issue list (an error page, a
//!   redirect stub) and the result is `UpstreamNotParseable`.

pub mod url;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, parse_source_url};

use cwgview_core::{AppConfig, Error, UpstreamFailure};

/// Literal every valid upstream document starts with.
pub const DOCUMENT_MARKER: &str = "<HTML>";

const MAX_REDIRECTS: usize = 5;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "cwg-view/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "cwg-view/0.1".to_string(), timeout: None }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// A validated upstream document.
#[derive(Debug, Clone)]
pub struct Document {
    /// The URL that was requested
    pub url: String,
    /// Full document text
    pub text: String,
    pub fetched_at: DateTime<Utc>,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl Document {
    /// Byte length of the document text.
    pub fn raw_size(&self) -> usize {
        self.text.len()
    }
}

/// Anything that can produce an upstream document for a URL.
///
/// The cache only talks to this trait, so the network client can be swapped
/// out without touching refresh logic.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, Error>;
}

/// HTTP fetch client for upstream documents.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Fetch a URL and validate that it is an issue-list document.
    pub async fn fetch(&self, url_str: &str) -> Result<Document, Error> {
        let start = Instant::now();
        let url = parse_source_url(url_str).map_err(|e| Error::InvalidUrl(format!("{url_str}: {e}")))?;

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| Error::UpstreamUnreachable(UpstreamFailure::transport(url_str, e.to_string())))?;

        let status = response.status();

        let text = response.text().await.map_err(|e| {
            Error::UpstreamUnreachable(UpstreamFailure {
                status: Some(status.as_u16()),
                ..UpstreamFailure::transport(url_str, format!("failed to read response: {e}"))
            })
        })?;

        if status != StatusCode::OK {
            return Err(Error::UpstreamUnreachable(UpstreamFailure::from_response(url_str, status.as_u16(), text)));
        }

        if !text.starts_with(DOCUMENT_MARKER) {
            return Err(Error::UpstreamNotParseable(UpstreamFailure::from_response(url_str, status.as_u16(), text)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(url = url_str, bytes = text.len(), fetch_ms, "fetched upstream document");

        Ok(Document { url: url_str.to_string(), text, fetched_at: Utc::now(), fetch_ms })
    }
}

#[async_trait]
impl DocumentSource for FetchClient {
    async fn fetch(&self, url: &str) -> Result<Document, Error> {
        FetchClient::fetch(self, url).await
    }
}
