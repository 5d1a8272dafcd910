//! Client configuration: where the backend lives and how long query results
//! stay fresh.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5513";
pub const DEFAULT_STALE_AFTER_SECS: u64 = 10;

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "BOOKSHELF_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend address; endpoint paths are appended to it.
    pub base_url: String,
    /// Age after which a cached query result is refetched on next access.
    pub stale_after_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

impl ClientConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Apply `BOOKSHELF_BASE_URL` from `lookup` when it is set and non-blank.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    /// # Errors
    /// Fails when `base_url` is not an http(s) address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got {url:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_and_ten_second_staleness() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5513");
        assert_eq!(config.stale_after(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_base_url() {
        let config = ClientConfig::default().with_env(|name| {
            (name == BASE_URL_ENV).then(|| "https://books.example".to_string())
        });
        assert_eq!(config.base_url, "https://books.example");
    }

    #[test]
    fn blank_env_is_ignored() {
        let config = ClientConfig::default().with_env(|_| Some("  ".to_string()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = ClientConfig {
            base_url: "localhost:5513".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
