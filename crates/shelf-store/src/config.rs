//! Collection layer configuration.

use std::time::Duration;

use shelf_core::defaults;

/// Configuration for [`crate::Shelf`].
#[derive(Debug, Clone)]
pub struct ShelfConfig {
    /// Name of the per-user backing repository.
    pub repo_name: String,
    /// Validity window of cached documents, in seconds.
    pub cache_ttl_secs: u64,
    /// Re-read/re-apply attempts after a version conflict.
    pub max_conflict_retries: u32,
    /// Polls while a freshly created repository becomes usable.
    pub provision_poll_attempts: u32,
    /// Delay between provisioning polls, in milliseconds.
    pub provision_poll_delay_ms: u64,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            repo_name: defaults::REPO_NAME.to_string(),
            cache_ttl_secs: defaults::CACHE_TTL_SECS,
            max_conflict_retries: defaults::MAX_CONFLICT_RETRIES,
            provision_poll_attempts: defaults::PROVISION_POLL_ATTEMPTS,
            provision_poll_delay_ms: defaults::PROVISION_POLL_DELAY_MS,
        }
    }
}

impl ShelfConfig {
    /// Create from environment variables, falling back to defaults.
    ///
    /// Reads `SHELF_REPO_NAME`, `SHELF_CACHE_TTL_SECS`,
    /// `SHELF_MAX_CONFLICT_RETRIES`, `SHELF_PROVISION_POLL_ATTEMPTS` and
    /// `SHELF_PROVISION_POLL_DELAY_MS`.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            repo_name: std::env::var("SHELF_REPO_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(base.repo_name),
            cache_ttl_secs: std::env::var("SHELF_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.cache_ttl_secs),
            max_conflict_retries: std::env::var("SHELF_MAX_CONFLICT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.max_conflict_retries),
            provision_poll_attempts: std::env::var("SHELF_PROVISION_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.provision_poll_attempts),
            provision_poll_delay_ms: std::env::var("SHELF_PROVISION_POLL_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.provision_poll_delay_ms),
        }
    }

    /// Cache TTL. Values too large to represent mean "never expires".
    pub fn cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn provision_poll_delay(&self) -> Duration {
        Duration::from_millis(self.provision_poll_delay_ms)
    }
}
