//! Issue identifiers and extracted issue fragments.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier embedded in an anchor marker, kept as the digit string it
/// appeared as.
///
/// Ordering is numeric: `7 < 12 < 103`. Leading zeros do not change the
/// magnitude; two spellings of the same number are ordered by their raw text
/// so that `Ord` stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Wrap a digit string. Returns `None` for empty or non-ASCII-digit input.
    pub fn parse(digits: &str) -> Option<Self> {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn magnitude(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }
}

impl Ord for IssueId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.magnitude(), other.magnitude());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.cmp(b))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for IssueId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One anchor-delimited fragment of an upstream document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    /// Classification tag of the source document the fragment came from.
    pub status: String,
    /// Verbatim text from this issue's anchor marker up to the next one.
    pub body: String,
}
