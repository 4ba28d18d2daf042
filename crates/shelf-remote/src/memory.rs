//! In-memory remote store.
//!
//! Mirrors the contract of the GitHub store (content-hash versions,
//! conflicts on stale or missing tokens, asynchronous repository creation)
//! without a network. Used by tests and for offline runs.
//!
//! ## Usage
//!
//! ```rust
//! use shelf_core::RepoRef;
//! use shelf_remote::MemoryStore;
//!
//! let store = MemoryStore::new().with_repository(RepoRef::new("octocat", "shelf-data"));
//! assert_eq!(store.write_count(), 0);
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use shelf_core::{Error, RemoteFile, RemoteStore, RepoRef, Result, VersionToken};

#[derive(Debug, Default)]
struct RepoState {
    files: HashMap<String, String>,
    /// Existence checks left before a freshly created repository shows up.
    pending_checks: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    repos: HashMap<RepoRef, RepoState>,
    unreachable: bool,
    failing_paths: HashSet<String>,
}

/// Remote store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    creation_delay: u32,
    reads: AtomicUsize,
    writes: AtomicUsize,
    conflicts: AtomicUsize,
}

/// Content hash used as version token.
pub fn content_version(content: &str) -> VersionToken {
    VersionToken::new(hex::encode(Sha256::digest(content.as_bytes())))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly created repositories stay invisible for `checks` existence checks.
    pub fn with_creation_delay(mut self, checks: u32) -> Self {
        self.creation_delay = checks;
        self
    }

    /// Start with an existing, empty repository.
    pub fn with_repository(self, repo: RepoRef) -> Self {
        self.lock().repos.entry(repo).or_default();
        self
    }

    /// Seed a file, creating the repository if needed.
    pub fn put_file(&self, repo: &RepoRef, path: &str, content: &str) {
        self.lock()
            .repos
            .entry(repo.clone())
            .or_default()
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// Current content of a file.
    pub fn file(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.lock()
            .repos
            .get(repo)
            .and_then(|r| r.files.get(path).cloned())
    }

    pub fn has_repository(&self, repo: &RepoRef) -> bool {
        self.lock().repos.contains_key(repo)
    }

    /// Make every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make writes to `path` fail with a transient error.
    pub fn fail_writes_to(&self, path: &str) {
        self.lock().failing_paths.insert(path.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing_paths.clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Writes rejected because of a stale or missing version token.
    pub fn conflict_count(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reachable(state: &MemoryState) -> Result<()> {
        if state.unreachable {
            return Err(Error::Transient("remote store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn repository_exists(&self, repo: &RepoRef) -> Result<bool> {
        let mut state = self.lock();
        Self::check_reachable(&state)?;
        match state.repos.get_mut(repo) {
            Some(r) if r.pending_checks > 0 => {
                r.pending_checks -= 1;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn create_repository(&self, repo: &RepoRef) -> Result<()> {
        let mut state = self.lock();
        Self::check_reachable(&state)?;
        if state.repos.contains_key(repo) {
            debug!(repo = %repo, "Repository already exists");
            return Ok(());
        }
        state.repos.insert(
            repo.clone(),
            RepoState {
                files: HashMap::new(),
                pending_checks: self.creation_delay,
            },
        );
        Ok(())
    }

    async fn read_file(&self, repo: &RepoRef, path: &str) -> Result<Option<RemoteFile>> {
        let snapshot = {
            let state = self.lock();
            Self::check_reachable(&state)?;
            state
                .repos
                .get(repo)
                .filter(|r| r.pending_checks == 0)
                .and_then(|r| r.files.get(path).cloned())
        };
        self.reads.fetch_add(1, Ordering::SeqCst);

        // Suspend like a network round trip so concurrent callers interleave.
        tokio::task::yield_now().await;

        Ok(snapshot.map(|content| RemoteFile {
            version: content_version(&content),
            content,
        }))
    }

    async fn write_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        _message: &str,
    ) -> Result<VersionToken> {
        let mut state = self.lock();
        Self::check_reachable(&state)?;
        if state.failing_paths.contains(path) {
            return Err(Error::Transient(format!("write to {} failed", path)));
        }
        let repo_state = state
            .repos
            .get_mut(repo)
            .filter(|r| r.pending_checks == 0)
            .ok_or_else(|| Error::NotFound(format!("repository {} not found", repo)))?;

        let current = repo_state.files.get(path).map(|c| content_version(c));
        if current.as_ref() != version {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Conflict(format!(
                "{}: expected {}, found {}",
                path,
                version.map(VersionToken::as_str).unwrap_or("<new file>"),
                current
                    .as_ref()
                    .map(VersionToken::as_str)
                    .unwrap_or("<missing>")
            )));
        }

        repo_state
            .files
            .insert(path.to_string(), content.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(content_version(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef::new("octocat", "shelf-data")
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let store = MemoryStore::new().with_repository(repo());
        assert!(store.read_file(&repo(), "data/stars.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_update_with_token() {
        let store = MemoryStore::new().with_repository(repo());
        let v1 = store
            .write_file(&repo(), "data/stars.json", "[]\n", None, "init")
            .await
            .unwrap();
        let read = store.read_file(&repo(), "data/stars.json").await.unwrap().unwrap();
        assert_eq!(read.version, v1);

        let v2 = store
            .write_file(&repo(), "data/stars.json", "[1]\n", Some(&v1), "update")
            .await
            .unwrap();
        assert_ne!(v1, v2);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_token_conflicts() {
        let store = MemoryStore::new().with_repository(repo());
        let v1 = store
            .write_file(&repo(), "f", "a", None, "init")
            .await
            .unwrap();
        store
            .write_file(&repo(), "f", "b", Some(&v1), "first")
            .await
            .unwrap();
        let err = store
            .write_file(&repo(), "f", "c", Some(&v1), "second")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.conflict_count(), 1);
        assert_eq!(store.file(&repo(), "f").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_create_existing_file_conflicts() {
        let store = MemoryStore::new().with_repository(repo());
        store.put_file(&repo(), "f", "a");
        let err = store
            .write_file(&repo(), "f", "b", None, "create")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_creation_delay() {
        let store = MemoryStore::new().with_creation_delay(2);
        store.create_repository(&repo()).await.unwrap();
        assert!(!store.repository_exists(&repo()).await.unwrap());
        assert!(!store.repository_exists(&repo()).await.unwrap());
        assert!(store.repository_exists(&repo()).await.unwrap());
        // creating again is not an error
        store.create_repository(&repo()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store = MemoryStore::new().with_repository(repo());
        store.set_unreachable(true);
        assert!(matches!(
            store.read_file(&repo(), "f").await,
            Err(Error::Transient(_))
        ));
        store.set_unreachable(false);
        assert!(store.read_file(&repo(), "f").await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_path() {
        let store = MemoryStore::new().with_repository(repo());
        store.fail_writes_to("data/stars.json");
        assert!(store
            .write_file(&repo(), "data/stars.json", "[]", None, "x")
            .await
            .is_err());
        assert!(store
            .write_file(&repo(), "data/notes.json", "[]", None, "x")
            .await
            .is_ok());
    }

    #[test]
    fn test_content_version_is_content_hash() {
        assert_eq!(content_version("a"), content_version("a"));
        assert_ne!(content_version("a"), content_version("b"));
        assert_eq!(content_version("a").as_str().len(), 64);
    }
}
