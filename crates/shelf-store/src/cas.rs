//! Compare-and-swap editing of a remote document.
//!
//! Every mutation goes through [`read_modify_write`]: read the document and
//! its version, apply a change in memory, write it back conditioned on that
//! version. A conflict means another client wrote in between; the whole
//! cycle is repeated against the fresh state, up to a retry budget.

use tracing::{debug, warn};

use shelf_core::codec;
use shelf_core::{Document, Error, RemoteStore, RepoRef, Result, VersionToken};

/// A decoded document and the version it was read at.
///
/// `version` is `None` when the file does not exist yet.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub version: Option<VersionToken>,
}

/// Outcome of applying a mutation to the in-memory collection.
#[derive(Debug)]
pub enum Mutation<R> {
    /// The collection changed and must be written back.
    Write(R),
    /// Nothing to persist.
    Unchanged(R),
}

/// Result of a completed read-modify-write.
#[derive(Debug)]
pub struct Committed<T, R> {
    /// Collection as persisted, in stored order.
    pub items: Vec<T>,
    pub output: R,
    pub version: Option<VersionToken>,
    /// False when the mutation was a no-op and no write was issued.
    pub written: bool,
    pub attempts: u32,
}

/// Read and decode one document, in stored order.
pub async fn read_collection<T: Document>(
    store: &dyn RemoteStore,
    repo: &RepoRef,
) -> Result<Snapshot<T>> {
    match store.read_file(repo, T::KIND.path()).await? {
        Some(file) => {
            let items = codec::decode::<T>(file.content.as_bytes())?;
            Ok(Snapshot {
                items,
                version: Some(file.version),
            })
        }
        None => Ok(Snapshot {
            items: Vec::new(),
            version: None,
        }),
    }
}

/// Apply `apply` to the remote collection of `T` with optimistic concurrency.
///
/// `apply` runs once per attempt against freshly read data, so it must be
/// repeatable. An error from `apply` aborts without writing. Conflicts are
/// retried `max_retries` times before giving up with `Error::Conflict`.
pub async fn read_modify_write<T, R, F>(
    store: &dyn RemoteStore,
    repo: &RepoRef,
    max_retries: u32,
    message: &str,
    mut apply: F,
) -> Result<Committed<T, R>>
where
    T: Document,
    R: Send,
    F: FnMut(&mut Vec<T>) -> Result<Mutation<R>> + Send,
{
    let path = T::KIND.path();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let Snapshot { mut items, version } = read_collection::<T>(store, repo).await?;

        let output = match apply(&mut items)? {
            Mutation::Write(output) => output,
            Mutation::Unchanged(output) => {
                debug!(
                    component = "cas",
                    repo = %repo,
                    path,
                    "Mutation is a no-op, skipping write"
                );
                return Ok(Committed {
                    items,
                    output,
                    version,
                    written: false,
                    attempts: attempt,
                });
            }
        };

        let content = codec::encode(&items)?;
        match store
            .write_file(repo, path, &content, version.as_ref(), message)
            .await
        {
            Ok(new_version) => {
                debug!(
                    component = "cas",
                    repo = %repo,
                    path,
                    attempt,
                    item_count = items.len(),
                    version = %new_version,
                    "Document written"
                );
                return Ok(Committed {
                    items,
                    output,
                    version: Some(new_version),
                    written: true,
                    attempts: attempt,
                });
            }
            Err(Error::Conflict(msg)) if attempt <= max_retries => {
                warn!(
                    component = "cas",
                    repo = %repo,
                    path,
                    attempt,
                    error = %msg,
                    "Version conflict, re-reading"
                );
            }
            Err(Error::Conflict(msg)) => {
                return Err(Error::Conflict(format!(
                    "{}: gave up after {} attempts: {}",
                    path, attempt, msg
                )));
            }
            Err(e) => return Err(e),
        }
    }
}
