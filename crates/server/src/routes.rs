//! HTTP routes.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/`, `/index.html` | Source list and every issue |
//! | `GET`  | `/cwg{id}` | One issue |
//! | `GET`  | `/robots.txt` | Disallow all crawlers |
//! | `GET`  | `/health` | Cache status as JSON |
//!
//! Page handlers call `maybe_refresh` first; that is the only place a request
//! can wait on upstream.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{Uri, header},
    response::{Html, IntoResponse},
    routing::get,
};
use chrono::{DateTime, Utc};
use cwgview_client::PageCache;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::WebError;
use crate::render;

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

/// Build the router over a shared cache.
pub fn router(cache: Arc<PageCache>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/index.html", get(index_page))
        .route("/robots.txt", get(robots_txt))
        .route("/health", get(health))
        .route("/{page}", get(issue_page))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(cache)
}

async fn robots_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ROBOTS_TXT)
}

async fn index_page(State(cache): State<Arc<PageCache>>) -> Result<Html<String>, WebError> {
    cache.maybe_refresh().await?;
    let issues = cache.list_issues().await?;
    let sources = cache.source_sizes().await;
    Ok(Html(render::index_page(&sources, &issues)))
}

/// Issue identifier from a `cwg<digits>` path segment.
fn issue_id(page: &str) -> Option<&str> {
    let digits = page.strip_prefix("cwg")?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

async fn issue_page(State(cache): State<Arc<PageCache>>, Path(page): Path<String>) -> Result<Html<String>, WebError> {
    let id = issue_id(&page).ok_or_else(|| WebError::NotFound(format!("/{page}")))?;
    cache.maybe_refresh().await?;
    let issue = cache.get_issue(id).await?;
    Ok(Html(render::issue_page(&issue)))
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    populated: bool,
    issues: usize,
    fetched_at: Option<DateTime<Utc>>,
}

async fn health(State(cache): State<Arc<PageCache>>) -> Json<HealthResponse> {
    let snapshot = cache.snapshot().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        populated: snapshot.is_some(),
        issues: snapshot.as_ref().map_or(0, |s| s.len()),
        fetched_at: snapshot.as_ref().and_then(|s| s.fetched_at()),
    })
}

async fn not_found(uri: Uri) -> WebError {
    WebError::NotFound(uri.path().to_string())
}
