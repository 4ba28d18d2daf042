//! Backing repository provisioning.
//!
//! Makes sure the per-user repository and both documents exist before the
//! first read or write. Creation on the host is asynchronous, so a freshly
//! created repository is polled until it becomes usable.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, instrument};

use shelf_core::codec::EMPTY_DOCUMENT;
use shelf_core::{DocumentKind, Error, RemoteStore, RepoRef, Result};

pub struct Provisioner {
    store: Arc<dyn RemoteStore>,
    poll_attempts: u32,
    poll_delay: Duration,
    ready: Mutex<HashSet<RepoRef>>,
}

impl Provisioner {
    pub fn new(store: Arc<dyn RemoteStore>, poll_attempts: u32, poll_delay: Duration) -> Self {
        Self {
            store,
            poll_attempts: poll_attempts.max(1),
            poll_delay,
            ready: Mutex::new(HashSet::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<RepoRef>> {
        self.ready.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether provisioning already succeeded in this process.
    pub fn is_provisioned(&self, repo: &RepoRef) -> bool {
        self.lock().contains(repo)
    }

    /// Drop the remembered state so the next call checks the remote again.
    pub fn forget(&self, repo: &RepoRef) {
        self.lock().remove(repo);
    }

    /// Create the repository and empty documents when missing.
    #[instrument(skip(self, repo), fields(component = "provision", repo = %repo))]
    pub async fn ensure_provisioned(&self, repo: &RepoRef) -> Result<()> {
        if self.is_provisioned(repo) {
            return Ok(());
        }

        if !self.store.repository_exists(repo).await? {
            info!("Creating backing repository");
            self.store.create_repository(repo).await?;
            self.wait_until_ready(repo).await?;
        }

        for kind in DocumentKind::ALL {
            self.ensure_document(repo, kind).await?;
        }

        self.lock().insert(repo.clone());
        debug!("Repository provisioned");
        Ok(())
    }

    async fn wait_until_ready(&self, repo: &RepoRef) -> Result<()> {
        for attempt in 1..=self.poll_attempts {
            match self.store.repository_exists(repo).await {
                Ok(true) => {
                    debug!(attempt, "Repository is ready");
                    return Ok(());
                }
                Ok(false) => debug!(attempt, "Repository not visible yet"),
                Err(e) if e.is_retryable() || e.is_not_found() => {
                    debug!(attempt, error = %e, "Readiness check failed, polling again")
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.poll_delay).await;
        }
        Err(Error::Transient(format!(
            "repository {} not ready after {} checks",
            repo, self.poll_attempts
        )))
    }

    async fn ensure_document(&self, repo: &RepoRef, kind: DocumentKind) -> Result<()> {
        let path = kind.path();
        for attempt in 1..=self.poll_attempts {
            if self.store.read_file(repo, path).await?.is_some() {
                return Ok(());
            }

            let message = format!("Initialize {}", kind);
            match self
                .store
                .write_file(repo, path, EMPTY_DOCUMENT, None, &message)
                .await
            {
                Ok(_) => {
                    info!(path, "Created empty document");
                    return Ok(());
                }
                Err(Error::Conflict(_)) => {
                    debug!(path, "Document created concurrently");
                    return Ok(());
                }
                // Repository exists but does not accept writes yet.
                Err(Error::NotFound(msg)) => {
                    debug!(path, attempt, error = %msg, "Document not writable yet");
                    tokio::time::sleep(self.poll_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Transient(format!(
            "could not initialize {} in {}",
            path, repo
        )))
    }
}
