//! Client code for cwg-view.
//!
//! This crate provides the upstream fetcher, the anchor-based snippet
//! indexer, and the refreshing cache that ties them together.

pub mod cache;
pub mod extract;
pub mod fetch;

pub use cache::{PageCache, SourceSummary};
pub use extract::{AnchorSpan, anchor_spans, index};
pub use fetch::{DOCUMENT_MARKER, Document, DocumentSource, FetchClient, FetchConfig};
