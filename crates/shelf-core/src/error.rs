//! Error types for shelf.

use thiserror::Error;

/// Result type alias using shelf's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for shelf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential missing, expired or rejected by the remote store
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (insufficient scope)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Remote quota exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Star not found in the star collection
    #[error("Star not found: {0}")]
    StarNotFound(String),

    /// Note not found in the note collection
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Supplied version token no longer matches the remote document
    #[error("Version conflict: {0}")]
    Conflict(String),

    /// Remote document is not a valid collection
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// Network failure, timeout or server-side error
    #[error("Transient error: {0}")]
    Transient(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request rejected for a reason not covered above
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the logical "item absent" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::StarNotFound(_) | Error::NoteNotFound(_)
        )
    }

    /// True when retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transient(_) | Error::RateLimited(_) | Error::Conflict(_)
        )
    }

    /// True when the caller has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Short actionable message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Unauthorized(_) => "Session expired, please sign in again.",
            Error::Forbidden(_) => "Access denied, check the token's repository scope.",
            Error::RateLimited(_) => "Rate limited by the remote store, try again later.",
            Error::StarNotFound(_) | Error::NoteNotFound(_) | Error::NotFound(_) => {
                "Item no longer exists."
            }
            Error::Conflict(_) => "Data changed elsewhere, please retry.",
            Error::Transient(_) => "Network problem, save failed, retry.",
            _ => "Save failed, retry.",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Error::Transient(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
