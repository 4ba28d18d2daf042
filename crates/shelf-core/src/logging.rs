//! Structured logging schema and field name constants for shelf.
//!
//! Every crate logs with these field names so JSON output
//! (`SHELF_LOG_FORMAT=json`) can be filtered the same way across layers.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Unused; failures are returned to the caller |
//! | WARN  | Recoverable issue, fallback applied (stale cache, retry, failed link) |
//! | INFO  | Repository created, mutation committed, document reset |
//! | DEBUG | Cache hits and misses, no-op mutations, remote status codes |

// ─── Subscriber setup ──────────────────────────────────────────────────────

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "shelf=info";

/// Environment variable selecting "json" or "text" output.
pub const LOG_FORMAT_ENV: &str = "SHELF_LOG_FORMAT";

// ─── Identity fields ───────────────────────────────────────────────────────

/// Layer originating the event.
/// Values: see [`COMPONENTS`].
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "add_star", "delete_note", "read_file"
pub const OPERATION: &str = "op";

/// Values of [`COMPONENT`] in use.
pub const COMPONENTS: [&str; 6] = ["remote", "provision", "cas", "cache", "codec", "shelf"];

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document kind ("stars" or "notes").
pub const KIND: &str = "kind";

/// Backing repository as `owner/name`.
pub const REPO: &str = "repo";

/// Document path inside the repository.
pub const PATH: &str = "path";

/// Cache storage key.
pub const KEY: &str = "key";

/// Note identifier.
pub const NOTE_ID: &str = "note_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// 1-based attempt number of a retried call.
pub const ATTEMPT: &str = "attempt";

/// Number of items in a collection.
pub const ITEM_COUNT: &str = "item_count";

/// Backoff before the next attempt, in milliseconds.
pub const DELAY_MS: &str = "delay_ms";

/// Age of a cache entry, in seconds.
pub const AGE_SECS: &str = "age_secs";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Whether a mutation issued a write.
pub const WRITTEN: &str = "written";
