//! Snippet indexing over the raw issue-list document.
//!
//! ### Anchor Grammar
//! - A marker is the literal `<A NAME="`, one or more ASCII digits, then `">`.
//! - Matching is case-sensitive and not HTML-aware: the upstream markup is not
//!   well-formed, so it is treated as plain text.
//!
//! ### Fragments
//! - Each marker opens a fragment that runs up to the next marker's `<`, or to
//!   the end of the text. The marker itself stays inside the fragment.
//! - Text before the first marker belongs to no fragment.

use std::sync::LazyLock;

use cwgview_core::{Issue, IssueId};
use regex::Regex;

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<A NAME="([0-9]+)">"#).expect("invalid anchor pattern"));

/// Byte range of one fragment within the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpan {
    pub id: IssueId,
    /// Offset of the marker's opening `<`.
    pub start: usize,
    /// Offset of the next marker's `<`, or the text length.
    pub end: usize,
}

/// Locate every anchor marker in one pass and pair up fragment boundaries.
pub fn anchor_spans(text: &str) -> Vec<AnchorSpan> {
    let mut spans: Vec<AnchorSpan> = Vec::new();

    for caps in ANCHOR.captures_iter(text) {
        let (Some(marker), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(id) = IssueId::parse(digits.as_str()) else {
            continue;
        };
        if let Some(prev) = spans.last_mut() {
            prev.end = marker.start();
        }
        spans.push(AnchorSpan { id, start: marker.start(), end: text.len() });
    }

    spans
}

/// Split a document into issues, in document order, tagging each with `status`.
///
/// Never fails: text without markers yields no issues.
pub fn index(text: &str, status: &str) -> Vec<Issue> {
    anchor_spans(text)
        .into_iter()
        .map(|span| Issue { id: span.id, status: status.to_string(), body: text[span.start..span.end].to_string() })
        .collect()
}
