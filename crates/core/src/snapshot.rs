//! Immutable captures of the upstream documents.
//!
//! A [`Snapshot`] is built once from the per-source [`SourcePage`]s and never
//! mutated afterwards; a refresh builds a new one and swaps it in whole.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::issue::{Issue, IssueId};

/// The indexed contents of one successfully fetched source document.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePage {
    pub url: String,
    pub status: String,
    pub fetched_at: DateTime<Utc>,
    /// Byte length of the raw document.
    pub raw_size: usize,
    /// Issues in document order.
    pub issues: Vec<Issue>,
}

/// One fully-indexed view over every configured source.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pages: Vec<Option<Arc<SourcePage>>>,
    issues: BTreeMap<IssueId, Issue>,
}

impl Snapshot {
    /// Build a snapshot from one slot per configured source, in source order.
    ///
    /// Slots are merged front to back, so when an identifier appears in more
    /// than one page the later page wins. Within one page only the first
    /// occurrence of an identifier counts.
    pub fn from_pages(pages: Vec<Option<Arc<SourcePage>>>) -> Self {
        let mut issues = BTreeMap::new();
        for page in pages.iter().flatten() {
            let mut seen = HashSet::new();
            for issue in &page.issues {
                if seen.insert(&issue.id) {
                    issues.insert(issue.id.clone(), issue.clone());
                }
            }
        }
        Self { pages, issues }
    }

    /// Per-source contributions, `None` where a source has never been fetched.
    pub fn pages(&self) -> &[Option<Arc<SourcePage>>] {
        &self.pages
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        let id = IssueId::parse(id)?;
        self.issues.get(&id)
    }

    /// Issues in ascending numeric identifier order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Combined byte length of every page in the snapshot.
    pub fn raw_size(&self) -> usize {
        self.pages.iter().flatten().map(|p| p.raw_size).sum()
    }

    /// Time of the most recent page capture.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.pages.iter().flatten().map(|p| p.fetched_at).max()
    }
}
