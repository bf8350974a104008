//! Core types and shared functionality for cwg-view.
//!
//! This crate provides:
//! - Issue identifiers, issues and immutable snapshots
//! - Unified error types
//! - Configuration structures
//! - Size formatting for display

pub mod config;
pub mod error;
pub mod issue;
pub mod size;
pub mod snapshot;

pub use config::{AppConfig, ConfigError, SourceConfig};
pub use error::{Error, UpstreamFailure};
pub use issue::{Issue, IssueId};
pub use size::describe_size;
pub use snapshot::{Snapshot, SourcePage};
