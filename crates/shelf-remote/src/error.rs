//! Mapping of remote HTTP failures onto shelf errors.

use shelf_core::Error;

/// Failure classes of the GitHub REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCode {
    /// Missing, expired or revoked credential.
    Unauthorized,
    /// Authenticated but lacking scope.
    Forbidden,
    /// Primary or secondary rate limit hit.
    RateLimited,
    /// Repository or path does not exist.
    NotFound,
    /// Supplied sha does not match the current file.
    Conflict,
    /// Request rejected as invalid.
    Unprocessable,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl RemoteErrorCode {
    /// Classify a response.
    ///
    /// A 403 is a rate limit when the remaining quota is zero or the body
    /// says so; otherwise it is a scope problem. A 422 that complains about
    /// the `sha` is a conflict: the file was created or changed underneath
    /// the writer.
    pub fn from_response(status: u16, rate_limit_remaining: Option<u64>, message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        match status {
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            403 if rate_limit_remaining == Some(0) || message.contains("rate limit") => {
                Self::RateLimited
            }
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 if message.contains("sha") => Self::Conflict,
            422 => Self::Unprocessable,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if the transport should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerError)
    }
}

/// Convert a classified failure to a shelf Error.
pub fn to_shelf_error(code: RemoteErrorCode, message: &str) -> Error {
    match code {
        RemoteErrorCode::Unauthorized => Error::Unauthorized(message.to_string()),
        RemoteErrorCode::Forbidden => Error::Forbidden(message.to_string()),
        RemoteErrorCode::RateLimited => Error::RateLimited(message.to_string()),
        RemoteErrorCode::NotFound => Error::NotFound(message.to_string()),
        RemoteErrorCode::Conflict => Error::Conflict(message.to_string()),
        RemoteErrorCode::Unprocessable => Error::InvalidInput(message.to_string()),
        RemoteErrorCode::ServerError => Error::Transient(message.to_string()),
        RemoteErrorCode::Unknown => Error::Request(message.to_string()),
    }
}
