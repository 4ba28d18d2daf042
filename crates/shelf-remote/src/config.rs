//! Remote store configuration.

use shelf_core::defaults;

/// Configuration for the GitHub-backed remote store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the REST API.
    pub api_url: String,
    /// Branch the documents live on.
    pub branch: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Retries for network failures and 5xx responses.
    pub transient_retries: u32,
    /// Base delay of the exponential backoff between retries.
    pub retry_backoff_ms: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::API_URL.to_string(),
            branch: defaults::BRANCH.to_string(),
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
            transient_retries: defaults::TRANSIENT_RETRIES,
            retry_backoff_ms: defaults::TRANSIENT_BACKOFF_MS,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Create from environment variables, falling back to defaults.
    ///
    /// Reads `SHELF_API_URL`, `SHELF_BRANCH`, `SHELF_HTTP_TIMEOUT`,
    /// `SHELF_TRANSIENT_RETRIES` and `SHELF_RETRY_BACKOFF_MS`.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            api_url: std::env::var("SHELF_API_URL").unwrap_or(base.api_url),
            branch: std::env::var("SHELF_BRANCH").unwrap_or(base.branch),
            timeout_seconds: std::env::var("SHELF_HTTP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.timeout_seconds),
            transient_retries: std::env::var("SHELF_TRANSIENT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.transient_retries),
            retry_backoff_ms: std::env::var("SHELF_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.retry_backoff_ms),
            user_agent: base.user_agent,
        }
    }

    /// Point at a different API host (tests, GitHub Enterprise).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_retries(mut self, retries: u32, backoff_ms: u64) -> Self {
        self.transient_retries = retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RemoteConfig::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.branch, "main");
        assert_eq!(config.transient_retries, 2);
    }

    #[test]
    fn test_builders() {
        let config = RemoteConfig::default()
            .with_api_url("http://127.0.0.1:9999")
            .with_retries(0, 1);
        assert_eq!(config.api_url, "http://127.0.0.1:9999");
        assert_eq!(config.transient_retries, 0);
        assert_eq!(config.retry_backoff_ms, 1);
    }
}
