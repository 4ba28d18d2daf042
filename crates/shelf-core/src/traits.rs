//! Core traits for shelf abstractions.
//!
//! These traits define the seams between the collection logic and its
//! collaborators: the remote object repository, the authentication layer,
//! the local key-value storage behind the cache, and the clock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use crate::error::Result;
use crate::models::{RemoteFile, RepoRef, User, VersionToken};

// =============================================================================
// REMOTE STORE
// =============================================================================

/// Path-addressed file storage with compare-and-swap writes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Check whether the repository exists and is visible to the caller.
    async fn repository_exists(&self, repo: &RepoRef) -> Result<bool>;

    /// Create a private, auto-initialized repository.
    ///
    /// A repository that already exists counts as success.
    async fn create_repository(&self, repo: &RepoRef) -> Result<()>;

    /// Read a file. A missing path is `Ok(None)`.
    async fn read_file(&self, repo: &RepoRef, path: &str) -> Result<Option<RemoteFile>>;

    /// Write a file, returning its new version.
    ///
    /// `version` must be the token last read for `path`, or `None` when the
    /// file is being created. A stale token fails with `Error::Conflict`.
    async fn write_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken>;
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Source of the signed-in identity and its credential.
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when signed out.
    fn current_user(&self) -> Option<User>;

    /// Header name/value pairs carrying the credential. Empty when signed out.
    fn auth_headers(&self) -> Vec<(String, String)>;
}

// =============================================================================
// CACHE STORAGE
// =============================================================================

/// String key-value storage backing the local cache.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
