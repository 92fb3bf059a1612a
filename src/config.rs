//! Centralized configuration management for eduadmin

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform API
    pub base_url: String,
    /// Directory holding the persisted realm tokens
    pub token_dir: PathBuf,
    /// Polling configuration for watched collections
    pub polling: PollingConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Records per page for client-side pagination
    pub page_size: usize,
}

/// Polling configuration for the watch command
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between collection refreshes (milliseconds)
    pub interval_ms: u64,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "eduadmin/0.1.0".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("EDUADMIN_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        let token_dir = std::env::var("EDUADMIN_TOKEN_DIR")
            .unwrap_or_else(|_| "./.eduadmin".to_string())
            .into();

        let polling = PollingConfig {
            interval_ms: parse_env_var("EDUADMIN_POLL_INTERVAL_MS")?.unwrap_or(5000),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("EDUADMIN_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("EDUADMIN_USER_AGENT")
                .unwrap_or_else(|_| "eduadmin/0.1.0".to_string()),
        };

        let page_size = parse_env_var("EDUADMIN_PAGE_SIZE")?.unwrap_or(5);

        Ok(Config {
            base_url,
            token_dir,
            polling,
            http,
            page_size,
        })
    }

    /// Get the polling interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("EDUADMIN_BASE_URL must not be empty"));
        }
        if self.page_size == 0 {
            return Err(anyhow::anyhow!("EDUADMIN_PAGE_SIZE must be at least 1"));
        }

        // Check the token directory can be created
        std::fs::create_dir_all(&self.token_dir).with_context(|| {
            format!("Cannot create token directory: {}", self.token_dir.display())
        })?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.polling.interval_ms, 5000);
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn test_config_validation_rejects_zero_page_size() {
        let mut config = Config::from_env().unwrap();
        config.token_dir = std::env::temp_dir().join("eduadmin-test-tokens");
        config.page_size = 0;
        assert!(config.validate().is_err());
    }
}
