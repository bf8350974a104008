//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no source is configured, and
    /// `ConfigError::Invalid` if:
    /// - a source URL is not an absolute http(s) URL
    /// - `ttl_secs` is 0
    /// - `user_agent` is empty
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Missing {
                field: "sources".into(),
                hint: "Set CWG_VIEW_URLS or add [[sources]] to the config file".into(),
            });
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            let parsed = url::Url::parse(source.url.trim()).map_err(|e| ConfigError::Invalid {
                field: "sources".into(),
                reason: format!("{}: {e}", source.url),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: "sources".into(),
                    reason: format!("{}: unsupported scheme {}", source.url, parsed.scheme()),
                });
            }
            if !seen.insert(source.url.as_str()) {
                tracing::warn!(url = %source.url, "source listed more than once; the later entry wins on merge");
            }
        }

        if self.ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "ttl_secs".into(), reason: "must be greater than 0".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        Ok(())
    }
}
