//! cwg-view server entry point.
//!
//! Loads configuration, builds the shared page cache and serves the browsing
//! pages over HTTP. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use cwgview_client::PageCache;
use cwgview_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod render;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(sources = config.sources.len(), ttl_secs = config.ttl_secs, "starting cwg-view");

    let cache = Arc::new(PageCache::from_config(&config)?);
    let app = routes::router(Arc::clone(&cache));

    // Warm the cache in the background.
    tokio::spawn(async move {
        if let Err(e) = cache.maybe_refresh().await {
            tracing::warn!(error = %e, "initial fetch failed, will retry on first request");
        }
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
