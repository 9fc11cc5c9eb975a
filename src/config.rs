//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs how scores are fetched from GitHub:
//! page sizes, page limits, the fallback week count and the week label format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URI of the GitHub API. Defaults to api.github.com when unset.
    #[serde(default)]
    pub github_api_url: Option<String>,

    /// Token used when a request carries no `Authorization` header.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Number of weeks scored when the `weeks` parameter is missing or unparseable.
    #[serde(default = "default_weeks")]
    pub default_weeks: usize,

    /// Largest accepted `weeks` parameter; larger values fall back to `default_weeks`.
    #[serde(default = "default_max_weeks")]
    pub max_weeks: usize,

    /// Number of nodes requested per GraphQL page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Hard limit on the number of pages fetched for a single connection.
    #[serde(default = "default_max_pages")]
    pub max_github_api_pages: u32,

    /// Upper bound on the time spent computing a single score.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// chrono format string used to label each week.
    #[serde(default = "default_week_label_format")]
    pub week_label_format: String,
}

fn default_port() -> u16 {
    8080
}

fn default_weeks() -> usize {
    6
}

fn default_max_weeks() -> usize {
    520
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

fn default_request_timeout() -> u64 {
    60
}

fn default_week_label_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            github_api_url: None,
            github_token: None,
            default_weeks: default_weeks(),
            max_weeks: default_max_weeks(),
            page_size: default_page_size(),
            max_github_api_pages: default_max_pages(),
            request_timeout_seconds: default_request_timeout(),
            week_label_format: default_week_label_format(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 7] = [
        "DEFAULT_WEEKS",
        "MAX_WEEKS",
        "PAGE_SIZE",
        "MAX_GITHUB_API_PAGES",
        "REQUEST_TIMEOUT_SECONDS",
        "WEEK_LABEL_FORMAT",
        "GITHUB_API_URL",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("DEFAULT_WEEKS", "12");
        env::set_var("MAX_WEEKS", "104");
        env::set_var("PAGE_SIZE", "25");
        env::set_var("MAX_GITHUB_API_PAGES", "5");
        env::set_var("REQUEST_TIMEOUT_SECONDS", "15");
        env::set_var("WEEK_LABEL_FORMAT", "%d/%m/%Y");
        env::set_var("GITHUB_API_URL", "https://github.example.com/api");

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.default_weeks, 12);
        assert_eq!(config.max_weeks, 104);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_github_api_pages, 5);
        assert_eq!(config.request_timeout(), StdDuration::from_secs(15));
        assert_eq!(config.week_label_format, "%d/%m/%Y");
        assert_eq!(
            config.github_api_url.as_deref(),
            Some("https://github.example.com/api")
        );

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_vars();
        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.default_weeks, 6);
        assert_eq!(config.max_weeks, 520);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_github_api_pages, 50);
        assert_eq!(config.week_label_format, "%Y-%m-%d");
        assert!(config.github_api_url.is_none());
    }

    #[test]
    #[serial]
    fn test_config_invalid_value() {
        env::set_var("PAGE_SIZE", "lots");
        let result = AppConfig::from_env();
        assert!(result.is_err());
        clear_vars();
    }
}
