//! In-memory refreshing cache over the configured upstream documents.
//!
//! ### States
//! - `Empty` until the first successful fetch, then `Populated` for the rest
//!   of the process lifetime. Nothing is persisted.
//!
//! ### Refresh Policy
//! - A refresh is attempted when the cache is empty, or when at least one TTL
//!   has passed since the last attempt, successful or not.
//! - Every source is fetched once per attempt. A source that fails keeps its
//!   previous contribution; the attempt still counts against the TTL.
//! - Failures are absorbed once a snapshot exists. While empty, the failure
//!   goes back to the caller that triggered the attempt.
//!
//! ### Concurrency
//! - Attempts are serialized by an async mutex held across the network calls.
//!   Once populated, a caller that finds an attempt in flight returns at once
//!   and reads the current snapshot; only the caller running the attempt waits
//!   on upstream. While empty, callers queue behind the attempt and see its
//!   result instead of starting their own.
//! - Readers only take a read lock on the current `Arc<Snapshot>`, which is
//!   swapped whole after indexing finishes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use cwgview_core::{AppConfig, Error, Issue, IssueId, Snapshot, SourceConfig, SourcePage, describe_size};

use crate::extract::index;
use crate::fetch::{DocumentSource, FetchClient, FetchConfig};

/// Display row for one configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub url: String,
    pub status: String,
    /// Human-readable size of the last successful fetch.
    pub size: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_attempt: Option<Instant>,
}

/// Process-wide cache of indexed upstream documents.
pub struct PageCache {
    source: Box<dyn DocumentSource>,
    sources: Vec<SourceConfig>,
    ttl: Duration,
    refresh: Mutex<RefreshState>,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl PageCache {
    /// Create an empty cache reading `sources` through `source`.
    pub fn new(source: impl DocumentSource + 'static, sources: Vec<SourceConfig>, ttl: Duration) -> Self {
        Self {
            source: Box::new(source),
            sources,
            ttl,
            refresh: Mutex::new(RefreshState::default()),
            current: RwLock::new(None),
        }
    }

    /// Create an empty cache backed by an HTTP [`FetchClient`].
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = FetchClient::new(&FetchConfig::from(config))?;
        Ok(Self::new(client, config.sources.clone(), config.ttl()))
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Refresh from upstream if the cache is empty or the TTL has elapsed.
    ///
    /// # Errors
    ///
    /// Returns the first upstream error only when every source failed and no
    /// snapshot exists yet. Failures are logged and absorbed otherwise.
    pub async fn maybe_refresh(&self) -> Result<(), Error> {
        let mut state = if self.is_populated().await {
            match self.refresh.try_lock() {
                Ok(state) => state,
                Err(_) => {
                    tracing::debug!("refresh already in flight, serving current snapshot");
                    return Ok(());
                }
            }
        } else {
            self.refresh.lock().await
        };

        let populated = self.is_populated().await;
        let due = state.last_attempt.is_none_or(|at| at.elapsed() >= self.ttl);
        if populated && !due {
            tracing::debug!("snapshot within TTL, skipping refresh");
            return Ok(());
        }

        let result = self.refresh_all().await;
        state.last_attempt = Some(Instant::now());
        result
    }

    async fn refresh_all(&self) -> Result<(), Error> {
        let previous = self.current.read().await.clone();
        let mut pages = match &previous {
            Some(snapshot) => snapshot.pages().to_vec(),
            None => vec![None; self.sources.len()],
        };

        let mut refreshed = 0usize;
        let mut first_error = None;

        for (slot, source) in pages.iter_mut().zip(&self.sources) {
            let status = source.status_tag();
            match self.source.fetch(&source.url).await {
                Ok(doc) => {
                    let issues = index(&doc.text, &status);
                    tracing::info!(
                        url = %source.url,
                        status = %status,
                        issues = issues.len(),
                        bytes = doc.raw_size(),
                        fetch_ms = doc.fetch_ms,
                        "indexed upstream document"
                    );
                    *slot = Some(Arc::new(SourcePage {
                        url: source.url.clone(),
                        status,
                        fetched_at: doc.fetched_at,
                        raw_size: doc.raw_size(),
                        issues,
                    }));
                    refreshed += 1;
                }
                Err(err) => {
                    tracing::warn!(url = %source.url, error = %err, "upstream fetch failed, keeping previous contents");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if refreshed > 0 {
            let snapshot = Snapshot::from_pages(pages);
            tracing::debug!(issues = snapshot.len(), bytes = snapshot.raw_size(), "swapping in new snapshot");
            *self.current.write().await = Some(Arc::new(snapshot));
        }

        match (previous, first_error) {
            (None, Some(err)) if refreshed == 0 => Err(err),
            _ => Ok(()),
        }
    }

    /// The current snapshot, if any fetch has ever succeeded.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub async fn is_populated(&self) -> bool {
        self.current.read().await.is_some()
    }

    async fn require_snapshot(&self) -> Result<Arc<Snapshot>, Error> {
        self.snapshot().await.ok_or(Error::NotYetAvailable)
    }

    /// Look up one issue by its identifier.
    ///
    /// # Errors
    ///
    /// `NotYetAvailable` while empty, `NoSuchIssue` if the identifier is not
    /// in the current snapshot.
    pub async fn get_issue(&self, id: &str) -> Result<Issue, Error> {
        let snapshot = self.require_snapshot().await?;
        snapshot.get(id).cloned().ok_or_else(|| Error::NoSuchIssue(id.to_string()))
    }

    /// Every issue with its status tag, in ascending numeric order.
    ///
    /// # Errors
    ///
    /// `NotYetAvailable` while empty.
    pub async fn list_issues(&self) -> Result<Vec<(IssueId, String)>, Error> {
        let snapshot = self.require_snapshot().await?;
        Ok(snapshot.issues().map(|issue| (issue.id.clone(), issue.status.clone())).collect())
    }

    /// Display rows for every configured source, in configured order.
    pub async fn source_sizes(&self) -> Vec<SourceSummary> {
        let snapshot = self.snapshot().await;
        self.sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let page = snapshot.as_ref().and_then(|s| s.pages().get(i).cloned().flatten());
                SourceSummary {
                    url: source.url.clone(),
                    status: source.status_tag(),
                    size: page.as_ref().map(|p| describe_size(p.raw_size as u64)),
                    fetched_at: page.as_ref().map(|p| p.fetched_at),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Document;
    use async_trait::async_trait;
    use cwgview_core::UpstreamFailure;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    const TTL: Duration = Duration::from_secs(3600);
    const ACTIVE: &str = "http://upstream.test/cwg_active.html";
    const CLOSED: &str = "http://upstream.test/cwg_closed.html";

    /// Serves whatever response is currently scripted for each URL.
    #[derive(Clone, Default)]
    struct ScriptedSource {
        responses: Arc<std::sync::Mutex<HashMap<String, Result<String, Error>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn serve(&self, url: &str, text: &str) {
            self.responses.lock().unwrap().insert(url.to_string(), Ok(text.to_string()));
        }

        fn fail(&self, url: &str) {
            let err = Error::UpstreamUnreachable(UpstreamFailure::from_response(url, 503, "Service Unavailable"));
            self.responses.lock().unwrap().insert(url.to_string(), Err(err));
        }

        fn fail_not_parseable(&self, url: &str) {
            let err = Error::UpstreamNotParseable(UpstreamFailure::from_response(
                url,
                200,
                "<!DOCTYPE html><html><body>Maintenance</body></html>",
            ));
            self.responses.lock().unwrap().insert(url.to_string(), Err(err));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSource for ScriptedSource {
        async fn fetch(&self, url: &str) -> Result<Document, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let response = self.responses.lock().unwrap().get(url).cloned();
            match response {
                Some(Ok(text)) => Ok(Document { url: url.to_string(), text, fetched_at: Utc::now(), fetch_ms: 1 }),
                Some(Err(err)) => Err(err),
                None => Err(Error::UpstreamUnreachable(UpstreamFailure::transport(url, "no route"))),
            }
        }
    }

    /// Holds each fetch until a permit is released; one permit per fetch.
    struct GatedSource {
        inner: ScriptedSource,
        gate: Arc<Semaphore>,
        waiting: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DocumentSource for GatedSource {
        async fn fetch(&self, url: &str) -> Result<Document, Error> {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            self.inner.fetch(url).await
        }
    }

    fn page(anchors: &[&str]) -> String {
        let mut text = String::from("<HTML>\n<BODY>\n");
        for id in anchors {
            text.push_str(&format!("<A NAME=\"{id}\"><H3>{id}. Issue {id}</H3>\n"));
        }
        text
    }

    fn cache(source: &ScriptedSource, urls: &[&str]) -> PageCache {
        let sources = urls.iter().map(|u| SourceConfig::new(*u)).collect();
        PageCache::new(source.clone(), sources, TTL)
    }

    fn listed(list: &[(IssueId, String)]) -> Vec<(&str, &str)> {
        list.iter().map(|(id, status)| (id.as_str(), status.as_str())).collect()
    }

    #[tokio::test]
    async fn test_cold_start_populates() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1", "2"]));
        let cache = cache(&source, &[ACTIVE]);

        assert!(!cache.is_populated().await);
        cache.maybe_refresh().await.unwrap();

        assert!(cache.is_populated().await);
        let issue = cache.get_issue("2").await.unwrap();
        assert_eq!(issue.status, "active");
        assert!(issue.body.contains("<A NAME=\"2\">"));
    }

    #[tokio::test]
    async fn test_reads_before_refresh_are_unavailable() {
        let source = ScriptedSource::default();
        let cache = cache(&source, &[ACTIVE]);

        assert!(matches!(cache.get_issue("1").await, Err(Error::NotYetAvailable)));
        assert!(matches!(cache.list_issues().await, Err(Error::NotYetAvailable)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cold_start_failure_surfaces() {
        let source = ScriptedSource::default();
        source.fail(ACTIVE);
        let cache = cache(&source, &[ACTIVE]);

        let err = cache.maybe_refresh().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnreachable(ref f) if f.status == Some(503)));
        assert!(matches!(cache.list_issues().await, Err(Error::NotYetAvailable)));
        assert!(matches!(cache.get_issue("1").await, Err(Error::NotYetAvailable)));
    }

    #[tokio::test]
    async fn test_empty_cache_retries_every_call() {
        let source = ScriptedSource::default();
        source.fail(ACTIVE);
        let cache = cache(&source, &[ACTIVE]);

        assert!(cache.maybe_refresh().await.is_err());
        assert!(cache.maybe_refresh().await.is_err());
        assert_eq!(source.calls(), 2);

        source.serve(ACTIVE, &page(&["5"]));
        cache.maybe_refresh().await.unwrap();
        assert!(cache.get_issue("5").await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_cold_start_is_not_an_error() {
        let source = ScriptedSource::default();
        source.fail(ACTIVE);
        source.serve(CLOSED, &page(&["3"]));
        let cache = cache(&source, &[ACTIVE, CLOSED]);

        cache.maybe_refresh().await.unwrap();
        assert_eq!(listed(&cache.list_issues().await.unwrap()), vec![("3", "closed")]);
    }

    #[tokio::test]
    async fn test_refresh_within_ttl_is_idempotent() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        let cache = cache(&source, &[ACTIVE]);

        cache.maybe_refresh().await.unwrap();
        let before = cache.snapshot().await.unwrap();

        source.serve(ACTIVE, &page(&["1", "2"]));
        cache.maybe_refresh().await.unwrap();
        let after = cache.snapshot().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&before, &after));
        assert!(matches!(cache.get_issue("2").await, Err(Error::NoSuchIssue(id)) if id == "2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_ttl() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        source.serve(ACTIVE, &page(&["1", "2"]));
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        cache.maybe_refresh().await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.maybe_refresh().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(cache.get_issue("2").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_serves_stale_data() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["103", "12", "7"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        let list_before = cache.list_issues().await.unwrap();
        let issue_before = cache.get_issue("12").await.unwrap();

        source.fail(ACTIVE);
        tokio::time::advance(TTL).await;
        cache.maybe_refresh().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.list_issues().await.unwrap(), list_before);
        assert_eq!(cache.get_issue("12").await.unwrap(), issue_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_still_waits_a_full_ttl() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        source.fail(ACTIVE);
        tokio::time::advance(TTL).await;
        cache.maybe_refresh().await.unwrap();

        source.serve(ACTIVE, &page(&["1", "2"]));
        tokio::time::advance(Duration::from_secs(60)).await;
        cache.maybe_refresh().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(matches!(cache.get_issue("2").await, Err(Error::NoSuchIssue(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_keeps_its_contribution() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        source.serve(CLOSED, &page(&["2"]));
        let cache = cache(&source, &[ACTIVE, CLOSED]);
        cache.maybe_refresh().await.unwrap();

        source.fail(ACTIVE);
        source.serve(CLOSED, &page(&["2", "3"]));
        tokio::time::advance(TTL).await;
        cache.maybe_refresh().await.unwrap();

        assert_eq!(
            listed(&cache.list_issues().await.unwrap()),
            vec![("1", "active"), ("2", "closed"), ("3", "closed")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetched_source_replaces_its_contribution() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1", "2"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        source.serve(ACTIVE, &page(&["2"]));
        tokio::time::advance(TTL).await;
        cache.maybe_refresh().await.unwrap();

        assert!(matches!(cache.get_issue("1").await, Err(Error::NoSuchIssue(id)) if id == "1"));
        assert!(cache.get_issue("2").await.is_ok());
    }

    #[tokio::test]
    async fn test_later_source_wins_merge() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["10", "11"]));
        source.serve(CLOSED, &page(&["11"]));
        let cache = cache(&source, &[ACTIVE, CLOSED]);
        cache.maybe_refresh().await.unwrap();

        assert_eq!(cache.get_issue("11").await.unwrap().status, "closed");
        assert_eq!(cache.get_issue("10").await.unwrap().status, "active");
    }

    #[tokio::test]
    async fn test_repeated_anchor_serves_first_snippet() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, "<HTML><A NAME=\"9\">first<A NAME=\"9\">second");
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        assert_eq!(cache.get_issue("9").await.unwrap().body, "<A NAME=\"9\">first");
        assert_eq!(cache.list_issues().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_numeric_not_lexicographic() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["103", "12", "7"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        let list = cache.list_issues().await.unwrap();
        assert_eq!(listed(&list), vec![("7", "active"), ("12", "active"), ("103", "active")]);
    }

    #[tokio::test]
    async fn test_no_such_issue() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        assert!(matches!(cache.get_issue("999").await, Err(Error::NoSuchIssue(id)) if id == "999"));
        assert!(matches!(cache.get_issue("01").await, Err(Error::NoSuchIssue(_))));
    }

    #[tokio::test]
    async fn test_document_without_anchors_populates_empty_snapshot() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, "<HTML><BODY>No issues yet</BODY></HTML>");
        let cache = cache(&source, &[ACTIVE]);

        cache.maybe_refresh().await.unwrap();
        assert!(cache.is_populated().await);
        assert!(cache.list_issues().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_parseable_refresh_serves_stale_data() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1", "2"]));
        let cache = cache(&source, &[ACTIVE]);
        cache.maybe_refresh().await.unwrap();

        let list_before = cache.list_issues().await.unwrap();
        let issue_before = cache.get_issue("2").await.unwrap();

        source.fail_not_parseable(ACTIVE);
        tokio::time::advance(TTL).await;
        cache.maybe_refresh().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.list_issues().await.unwrap(), list_before);
        assert_eq!(cache.get_issue("2").await.unwrap(), issue_before);
    }

    #[tokio::test]
    async fn test_cold_start_not_parseable_surfaces() {
        let source = ScriptedSource::default();
        source.fail_not_parseable(ACTIVE);
        let cache = cache(&source, &[ACTIVE]);

        let err = cache.maybe_refresh().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamNotParseable(ref f) if f.status == Some(200)));
        assert!(matches!(cache.list_issues().await, Err(Error::NotYetAvailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_populated_cache_does_not_wait_for_in_flight_refresh() {
        let inner = ScriptedSource::default();
        inner.serve(ACTIVE, &page(&["1"]));
        let gate = Arc::new(Semaphore::new(1));
        let waiting = Arc::new(AtomicUsize::new(0));
        let source = GatedSource { inner: inner.clone(), gate: Arc::clone(&gate), waiting: Arc::clone(&waiting) };
        let cache = Arc::new(PageCache::new(source, vec![SourceConfig::new(ACTIVE)], TTL));
        cache.maybe_refresh().await.unwrap();

        inner.serve(ACTIVE, &page(&["1", "2"]));
        tokio::time::advance(TTL).await;

        let refreshing = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.maybe_refresh().await })
        };
        while waiting.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        let other = tokio::time::timeout(Duration::from_secs(30), cache.maybe_refresh()).await;
        assert!(matches!(other, Ok(Ok(()))));
        assert!(cache.get_issue("1").await.is_ok());
        assert!(matches!(cache.get_issue("2").await, Err(Error::NoSuchIssue(_))));
        assert_eq!(waiting.load(Ordering::SeqCst), 2);

        gate.add_permits(1);
        refreshing.await.unwrap().unwrap();
        assert!(cache.get_issue("2").await.is_ok());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = ScriptedSource::default();
        source.serve(ACTIVE, &page(&["1"]));
        source.serve(CLOSED, &page(&["2"]));
        let cache = Arc::new(cache(&source, &[ACTIVE, CLOSED]));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.maybe_refresh().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.list_issues().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_source_sizes() {
        let source = ScriptedSource::default();
        let big = format!("{}{}", page(&["1"]), " ".repeat(20_000));
        source.serve(ACTIVE, &big);
        source.fail(CLOSED);
        let cache = cache(&source, &[ACTIVE, CLOSED]);

        let before = cache.source_sizes().await;
        assert!(before.iter().all(|s| s.size.is_none()));

        cache.maybe_refresh().await.unwrap();
        let after = cache.source_sizes().await;

        assert_eq!(after.len(), 2);
        assert_eq!(after[0].url, ACTIVE);
        assert_eq!(after[0].status, "active");
        assert_eq!(after[0].size.as_deref(), Some(describe_size(big.len() as u64).as_str()));
        assert!(after[0].fetched_at.is_some());
        assert_eq!(after[1].status, "closed");
        assert!(after[1].size.is_none());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { ttl_secs: 60, ..Default::default() };
        let cache = PageCache::from_config(&config).unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(60));
        assert_eq!(cache.sources().len(), 3);
    }
}
