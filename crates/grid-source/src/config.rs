//! Configuration for the WCS coverage source.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the coverage server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSourceConfig {
    /// Server root, e.g. `https://geo.aclimate.org/geoserver/`.
    pub base_url: String,

    pub user: Option<String>,

    pub password: Option<String>,

    /// Concurrent day requests per year.
    pub max_parallel_downloads: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for transient failures on a single day.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles each retry).
    pub initial_retry_delay_ms: u64,

    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for GridSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://geo.aclimate.org/geoserver/".to_string(),
            user: None,
            password: None,
            max_parallel_downloads: 4,
            timeout_secs: 60,
            max_retries: 2,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 5_000,
        }
    }
}

impl GridSourceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GEOSERVER_URL") {
            if !val.trim().is_empty() {
                config.base_url = val;
            }
        }

        config.user = std::env::var("GEOSERVER_USER").ok().filter(|v| !v.is_empty());
        config.password = std::env::var("GEOSERVER_PASSWORD")
            .ok()
            .filter(|v| !v.is_empty());

        if let Ok(val) = std::env::var("MAX_PARALLEL_DOWNLOADS") {
            if let Ok(n) = val.parse() {
                config.max_parallel_downloads = n;
            }
        }

        if let Ok(val) = std::env::var("GEOSERVER_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("GEOSERVER_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                config.max_retries = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL: {}", self.base_url));
        }

        if self.max_parallel_downloads == 0 {
            return Err("max_parallel_downloads must be > 0".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }

        Ok(())
    }

    /// Server root with a trailing slash and any `/rest` suffix removed.
    pub fn server_root(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix("/rest").unwrap_or(trimmed);
        format!("{}/", trimmed)
    }

    /// Credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
