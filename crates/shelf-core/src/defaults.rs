//! Centralized default constants for shelf.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Environment overrides are read by the config structs in
//! `shelf-remote` and `shelf-store`.

// =============================================================================
// BACKING REPOSITORY
// =============================================================================

/// Name of the per-user backing repository.
pub const REPO_NAME: &str = "shelf-data";

/// Description set on the backing repository when it is created.
pub const REPO_DESCRIPTION: &str = "Starred items and notes (managed by shelf)";

/// Branch holding the documents.
pub const BRANCH: &str = "main";

/// Path of the star collection inside the repository.
pub const STARS_PATH: &str = "data/stars.json";

/// Path of the note collection inside the repository.
pub const NOTES_PATH: &str = "data/notes.json";

// =============================================================================
// REMOTE STORE
// =============================================================================

/// GitHub REST API base URL.
pub const API_URL: &str = "https://api.github.com";

/// GitHub REST API version header value.
pub const API_VERSION: &str = "2022-11-28";

/// User-Agent sent with every request (GitHub rejects requests without one).
pub const USER_AGENT: &str = "shelf";

/// HTTP request timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Transport-level retries for transient failures (network, 5xx).
pub const TRANSIENT_RETRIES: u32 = 2;

/// Base delay for exponential backoff between transient retries.
pub const TRANSIENT_BACKOFF_MS: u64 = 250;

// =============================================================================
// CONCURRENCY
// =============================================================================

/// Re-read/re-apply attempts after a version conflict before giving up.
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Polls while waiting for a freshly created repository to become usable.
pub const PROVISION_POLL_ATTEMPTS: u32 = 10;

/// Delay between provisioning polls.
pub const PROVISION_POLL_DELAY_MS: u64 = 1000;

// =============================================================================
// CACHE
// =============================================================================

/// Validity window of cached documents (5 minutes).
pub const CACHE_TTL_SECS: u64 = 300;

/// Prefix of every cache key.
pub const CACHE_KEY_PREFIX: &str = "shelf";

/// Directory used by the file-backed cache when none is configured.
pub const CACHE_DIR: &str = ".shelf-cache";

// =============================================================================
// STATS
// =============================================================================

/// Number of tags reported in `Stats::top_tags`.
pub const TOP_TAGS_LIMIT: usize = 10;

// =============================================================================
// ACTION LINKS
// =============================================================================

/// Hex characters kept from the HMAC-SHA256 digest.
pub const SIGNATURE_LEN: usize = 16;
