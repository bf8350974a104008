//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CWG_VIEW_*, plus the bare PORT)
//! 2. CWG_VIEW_URLS, a comma-separated source list
//! 3. TOML config file (if CWG_VIEW_CONFIG_FILE set)
//! 4. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

const DEFAULT_SOURCES: [&str; 3] = [
    "http://www.open-std.org/jtc1/sc22/wg21/docs/cwg_active.html",
    "http://www.open-std.org/jtc1/sc22/wg21/docs/cwg_closed.html",
    "http://www.open-std.org/jtc1/sc22/wg21/docs/cwg_defects.html",
];

/// One upstream issue-list document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,

    /// Explicit status tag for every issue in this document.
    ///
    /// When absent the tag is inferred from the URL, see [`SourceConfig::status_tag`].
    #[serde(default)]
    pub status: Option<String>,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), status: None }
    }

    pub fn with_status(url: impl Into<String>, status: impl Into<String>) -> Self {
        Self { url: url.into(), status: Some(status.into()) }
    }

    /// The configured status, or `active`/`closed`/`defect` by URL substring.
    pub fn status_tag(&self) -> String {
        if let Some(status) = &self.status {
            return status.clone();
        }
        if self.url.contains("active") {
            "active".into()
        } else if self.url.contains("closed") {
            "closed".into()
        } else {
            "defect".into()
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CWG_VIEW_*, PORT)
/// 2. CWG_VIEW_URLS
/// 3. TOML config file (if CWG_VIEW_CONFIG_FILE set)
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream documents, in merge order.
    ///
    /// Set via `[[sources]]` tables in the config file, or CWG_VIEW_URLS
    /// (comma-separated; status tags are inferred).
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    /// Interface to listen on.
    ///
    /// Set via CWG_VIEW_HOST environment variable.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port.
    ///
    /// Set via PORT or CWG_VIEW_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum interval between refresh attempts, in seconds.
    ///
    /// Set via CWG_VIEW_TTL_SECS environment variable.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// User-Agent string for upstream requests.
    ///
    /// Set via CWG_VIEW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds. Unset means the HTTP
    /// client's default.
    ///
    /// Set via CWG_VIEW_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_sources() -> Vec<SourceConfig> {
    DEFAULT_SOURCES.iter().map(|url| SourceConfig::new(*url)).collect()
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_user_agent() -> String {
    "cwg-view/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            host: default_host(),
            port: default_port(),
            ttl_secs: default_ttl_secs(),
            user_agent: default_user_agent(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Refresh interval as Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// `host:port` to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CWG_VIEW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(Env::raw().only(&["PORT"]).map(|key| key.as_str().to_lowercase().into()))
            .merge(
                Env::prefixed("CWG_VIEW_")
                    .ignore(&["CONFIG_FILE", "URLS"])
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if let Ok(urls) = std::env::var("CWG_VIEW_URLS") {
            config.sources = parse_url_list(&urls);
        }

        config.validate()?;

        Ok(config)
    }
}

/// Split a comma-separated URL list into untagged sources, skipping blanks.
pub fn parse_url_list(list: &str) -> Vec<SourceConfig> {
    list.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(SourceConfig::new)
        .collect()
}
