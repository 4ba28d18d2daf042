//! Collection operations over the remote store.
//!
//! [`Shelf`] is the entry point for reading and editing a user's stars and
//! notes. Reads go remote first and fall back to the local cache; writes go
//! through [`read_modify_write`] and refresh the cache with what was
//! persisted. Keeping a star's `note_id` in step with its note is a
//! best-effort secondary write: its failure is logged and never fails the
//! primary operation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use shelf_core::codec::EMPTY_DOCUMENT;
use shelf_core::{
    normalize_tags, sort_newest_first, ActionLink, AuthProvider, CacheStorage, Clock, Document,
    DocumentKind, Error, NoteDraft, NoteItem, NotePatch, RemoteStore, RepoRef, Result, StarItem,
    SyncState, SystemClock, User,
};

use crate::cache::LocalCache;
use crate::cas::{read_collection, read_modify_write, Mutation};
use crate::config::ShelfConfig;
use crate::provision::Provisioner;
use crate::stats::{self, Stats};

/// Outcome of a best-effort star/note link update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A star was changed.
    Updated,
    /// Nothing needed changing.
    Unchanged,
    /// The update failed; the primary operation still succeeded.
    Failed(String),
}

/// Stars and notes of the signed-in user.
pub struct Shelf {
    store: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    cache: LocalCache,
    provisioner: Provisioner,
    clock: Arc<dyn Clock>,
    config: ShelfConfig,
    sync: Mutex<HashMap<(String, DocumentKind), SyncState>>,
}

impl Shelf {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn CacheStorage>,
        config: ShelfConfig,
    ) -> Self {
        Self::with_clock(store, auth, storage, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn CacheStorage>,
        clock: Arc<dyn Clock>,
        config: ShelfConfig,
    ) -> Self {
        let cache = LocalCache::new(storage, clock.clone(), config.cache_ttl());
        let provisioner = Provisioner::new(
            store.clone(),
            config.provision_poll_attempts,
            config.provision_poll_delay(),
        );
        Self {
            store,
            auth,
            cache,
            provisioner,
            clock,
            config,
            sync: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// All stars, newest first.
    pub async fn list_stars(&self) -> Result<Vec<StarItem>> {
        self.list::<StarItem>().await
    }

    /// All notes, newest first.
    pub async fn list_notes(&self) -> Result<Vec<NoteItem>> {
        self.list::<NoteItem>().await
    }

    /// Fresh cached stars without touching the network.
    pub async fn cached_stars(&self) -> Option<Vec<StarItem>> {
        let scope = self.cache_scope().await?;
        self.cache.get(&scope).await
    }

    /// Fresh cached notes without touching the network.
    pub async fn cached_notes(&self) -> Option<Vec<NoteItem>> {
        let scope = self.cache_scope().await?;
        self.cache.get(&scope).await
    }

    /// The note annotating `content_id`, if any.
    pub async fn note_for(&self, content_id: &str) -> Result<Option<NoteItem>> {
        let notes = self.list_notes().await?;
        Ok(notes.into_iter().find(|n| n.content_id == content_id))
    }

    pub async fn get_stats(&self) -> Result<Stats> {
        let stars = self.list_stars().await?;
        let notes = self.list_notes().await?;
        Ok(stats::compute(&stars, &notes))
    }

    async fn list<T: Document>(&self) -> Result<Vec<T>> {
        let Some(user) = self.auth.current_user() else {
            return self.signed_out_fallback::<T>().await;
        };
        self.cache.remember_user(&user.handle).await;
        let repo = self.repo_for(&user);

        match self.fetch::<T>(&user, &repo).await {
            Ok(items) => Ok(items),
            Err(Error::CorruptDocument(msg)) => {
                warn!(
                    component = "shelf",
                    kind = %T::KIND,
                    repo = %repo,
                    error = %msg,
                    "Remote document is corrupt, returning empty collection"
                );
                Ok(Vec::new())
            }
            Err(e) => match self.cache.get_stale::<T>(&user.handle).await {
                Some(cached) => {
                    warn!(
                        component = "shelf",
                        kind = %T::KIND,
                        error = %e,
                        age_secs = cached.age(self.clock.now()).num_seconds(),
                        "Remote read failed, serving cached data"
                    );
                    Ok(cached.items)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch<T: Document>(&self, user: &User, repo: &RepoRef) -> Result<Vec<T>> {
        self.provision(user, repo).await?;
        let snapshot = read_collection::<T>(self.store.as_ref(), repo).await?;
        let mut items = snapshot.items;
        sort_newest_first(&mut items);
        self.cache.set(&user.handle, &items).await;
        self.set_sync(&user.handle, T::KIND, SyncState::Synced);
        debug!(
            component = "shelf",
            kind = %T::KIND,
            item_count = items.len(),
            "Fetched remote collection"
        );
        Ok(items)
    }

    async fn signed_out_fallback<T: Document>(&self) -> Result<Vec<T>> {
        if let Some(handle) = self.cache.last_user().await {
            if let Some(cached) = self.cache.get_stale::<T>(&handle).await {
                info!(
                    component = "shelf",
                    kind = %T::KIND,
                    handle = %handle,
                    "Signed out, serving cached data of last user"
                );
                return Ok(cached.items);
            }
        }
        Err(Error::Unauthorized("not signed in".to_string()))
    }

    // =========================================================================
    // STARS
    // =========================================================================

    /// Insert or replace a star by id.
    ///
    /// A replacement keeps the existing `note_id` when `item` carries none.
    /// Re-adding an identical star writes nothing.
    pub async fn add_star(&self, mut item: StarItem) -> Result<StarItem> {
        if item.id.trim().is_empty() {
            return Err(Error::InvalidInput("star id is empty".to_string()));
        }
        item.tags = normalize_tags(std::mem::take(&mut item.tags));
        let message = format!("Star {}", item.id);

        self.mutate::<StarItem, _, _>("add_star", &message, |stars| {
            match stars.iter_mut().find(|s| s.id == item.id) {
                Some(existing) => {
                    let mut merged = item.clone();
                    if merged.note_id.is_none() {
                        merged.note_id = existing.note_id.clone();
                    }
                    if *existing == merged {
                        return Ok(Mutation::Unchanged(merged));
                    }
                    *existing = merged.clone();
                    Ok(Mutation::Write(merged))
                }
                None => {
                    stars.insert(0, item.clone());
                    Ok(Mutation::Write(item.clone()))
                }
            }
        })
        .await
    }

    /// Remove a star, returning it. Its note, if any, is kept.
    pub async fn remove_star(&self, id: &str) -> Result<StarItem> {
        let message = format!("Unstar {}", id);
        self.mutate::<StarItem, _, _>("remove_star", &message, |stars| {
            let index = stars
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| Error::StarNotFound(id.to_string()))?;
            Ok(Mutation::Write(stars.remove(index)))
        })
        .await
    }

    /// Replace the tags of a star.
    pub async fn update_star_tags<I, S>(&self, id: &str, tags: I) -> Result<StarItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = normalize_tags(tags);
        let message = format!("Tag {}", id);
        self.mutate::<StarItem, _, _>("update_star_tags", &message, |stars| {
            let star = stars
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| Error::StarNotFound(id.to_string()))?;
            if star.tags == tags {
                return Ok(Mutation::Unchanged(star.clone()));
            }
            star.tags = tags.clone();
            Ok(Mutation::Write(star.clone()))
        })
        .await
    }

    /// Verify a signed action link and star the content it describes.
    pub async fn star_from_link(&self, link: &str, secret: &str) -> Result<StarItem> {
        let link = ActionLink::parse(link)?;
        if !link.verify(secret) {
            warn!(
                component = "shelf",
                content_id = %link.content_id,
                "Rejected action link with invalid signature"
            );
            return Err(Error::InvalidInput("invalid link signature".to_string()));
        }
        self.add_star(link.to_star(self.clock.now())).await
    }

    // =========================================================================
    // NOTES
    // =========================================================================

    /// Create the note of a content item, or update its text if one exists.
    ///
    /// Afterwards the star with the same content id gets its `note_id` set
    /// when missing. That link is best-effort.
    pub async fn add_note(&self, draft: NoteDraft) -> Result<NoteItem> {
        if draft.content_id.trim().is_empty() {
            return Err(Error::InvalidInput("note content id is empty".to_string()));
        }
        let now = self.clock.now();
        let fresh = draft.clone().into_note(now);
        let message = format!("Note on {}", draft.content_id);

        let (note, note_ids) = self
            .mutate::<NoteItem, _, _>("add_note", &message, |notes| {
                let note = match notes.iter_mut().find(|n| n.content_id == draft.content_id) {
                    Some(existing) => {
                        existing.thoughts = draft.thoughts.clone();
                        existing.questions = draft.questions.clone();
                        existing.todos = draft.todos.clone();
                        existing.updated_at = now;
                        existing.clone()
                    }
                    None => {
                        notes.insert(0, fresh.clone());
                        fresh.clone()
                    }
                };
                let ids: HashSet<String> = notes.iter().map(|n| n.id.clone()).collect();
                Ok(Mutation::Write((note, ids)))
            })
            .await?;

        let outcome = self.link_note(&note, &note_ids).await;
        debug!(
            component = "shelf",
            note_id = %note.id,
            outcome = ?outcome,
            "Star link updated"
        );
        Ok(note)
    }

    /// Merge `patch` into a note and bump its `updated_at`.
    ///
    /// An empty patch changes nothing and returns the note as stored.
    pub async fn update_note(&self, id: &str, patch: NotePatch) -> Result<NoteItem> {
        let now = self.clock.now();
        let message = format!("Update note {}", id);
        self.mutate::<NoteItem, _, _>("update_note", &message, |notes| {
            let note = notes
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| Error::NoteNotFound(id.to_string()))?;
            if patch.is_empty() {
                return Ok(Mutation::Unchanged(note.clone()));
            }
            patch.apply(note, now);
            Ok(Mutation::Write(note.clone()))
        })
        .await
    }

    /// Delete a note, then clear `note_id` on stars pointing at it.
    ///
    /// The links are cleared even when the note is already gone: a delete
    /// whose acknowledgement was lost comes back as `NoteNotFound` on retry.
    pub async fn delete_note(&self, id: &str) -> Result<NoteItem> {
        let message = format!("Delete note {}", id);
        let result = self
            .mutate::<NoteItem, _, _>("delete_note", &message, |notes| {
                let index = notes
                    .iter()
                    .position(|n| n.id == id)
                    .ok_or_else(|| Error::NoteNotFound(id.to_string()))?;
                Ok(Mutation::Write(notes.remove(index)))
            })
            .await;

        match result {
            Ok(_) | Err(Error::NoteNotFound(_)) => {
                let outcome = self.unlink_note(id).await;
                debug!(
                    component = "shelf",
                    note_id = %id,
                    outcome = ?outcome,
                    "Star links cleared"
                );
            }
            Err(_) => {}
        }
        result
    }

    /// Point the star of `note` at it when the star has no link or its link
    /// names a note missing from `note_ids`.
    async fn link_note(&self, note: &NoteItem, note_ids: &HashSet<String>) -> LinkOutcome {
        let message = format!("Link note {}", note.id);
        let result = self
            .mutate::<StarItem, _, _>("link_note", &message, |stars| {
                let target = stars.iter_mut().find(|s| {
                    s.id == note.content_id
                        && s.note_id.as_ref().map_or(true, |id| !note_ids.contains(id))
                });
                match target {
                    Some(star) => {
                        if star.note_id.is_some() {
                            warn!(
                                component = "shelf",
                                star_id = %star.id,
                                stale_note_id = ?star.note_id,
                                "Replacing link to a missing note"
                            );
                        }
                        star.note_id = Some(note.id.clone());
                        Ok(Mutation::Write(LinkOutcome::Updated))
                    }
                    None => Ok(Mutation::Unchanged(LinkOutcome::Unchanged)),
                }
            })
            .await;
        Self::secondary(result, "link_note")
    }

    async fn unlink_note(&self, note_id: &str) -> LinkOutcome {
        let message = format!("Unlink note {}", note_id);
        let result = self
            .mutate::<StarItem, _, _>("unlink_note", &message, |stars| {
                let mut changed = false;
                for star in stars.iter_mut() {
                    if star.note_id.as_deref() == Some(note_id) {
                        star.note_id = None;
                        changed = true;
                    }
                }
                if changed {
                    Ok(Mutation::Write(LinkOutcome::Updated))
                } else {
                    Ok(Mutation::Unchanged(LinkOutcome::Unchanged))
                }
            })
            .await;
        Self::secondary(result, "unlink_note")
    }

    fn secondary(result: Result<LinkOutcome>, op: &'static str) -> LinkOutcome {
        result.unwrap_or_else(|e| {
            warn!(
                component = "shelf",
                op,
                error = %e,
                "Secondary write failed, primary change kept"
            );
            LinkOutcome::Failed(e.to_string())
        })
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Overwrite a document with an empty collection.
    ///
    /// The only way to replace a document that no longer decodes; normal
    /// mutations refuse to write over it.
    pub async fn reset_document(&self, kind: DocumentKind) -> Result<()> {
        let (user, repo) = self.session().await?;
        self.provision(&user, &repo).await?;

        let current = self.store.read_file(&repo, kind.path()).await?;
        let version = current.map(|f| f.version);
        self.store
            .write_file(
                &repo,
                kind.path(),
                EMPTY_DOCUMENT,
                version.as_ref(),
                &format!("Reset {}", kind),
            )
            .await?;

        self.cache.invalidate(&user.handle, kind).await;
        self.set_sync(&user.handle, kind, SyncState::Synced);
        info!(component = "shelf", kind = %kind, repo = %repo, "Document reset");
        Ok(())
    }

    /// Synchronization state of a document for the current user.
    pub fn sync_state(&self, kind: DocumentKind) -> SyncState {
        match self.auth.current_user() {
            Some(user) => self
                .lock_sync()
                .get(&(user.handle, kind))
                .copied()
                .unwrap_or_default(),
            None => SyncState::Unprovisioned,
        }
    }

    /// Drop the cached documents of the current (or last) user.
    pub async fn purge_cache(&self) {
        if let Some(scope) = self.cache_scope().await {
            self.cache.purge(&scope).await;
            info!(component = "shelf", handle = %scope, "Cache purged");
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn repo_for(&self, user: &User) -> RepoRef {
        RepoRef::for_user(user, &self.config.repo_name)
    }

    async fn session(&self) -> Result<(User, RepoRef)> {
        let user = self
            .auth
            .current_user()
            .ok_or_else(|| Error::Unauthorized("not signed in".to_string()))?;
        self.cache.remember_user(&user.handle).await;
        let repo = self.repo_for(&user);
        Ok((user, repo))
    }

    async fn cache_scope(&self) -> Option<String> {
        match self.auth.current_user() {
            Some(user) => Some(user.handle),
            None => self.cache.last_user().await,
        }
    }

    async fn provision(&self, user: &User, repo: &RepoRef) -> Result<()> {
        let fresh = !self.provisioner.is_provisioned(repo);
        self.provisioner.ensure_provisioned(repo).await?;
        if fresh {
            for kind in DocumentKind::ALL {
                self.promote_sync(&user.handle, kind, SyncState::Provisioned);
            }
        }
        Ok(())
    }

    async fn mutate<T, R, F>(&self, op: &'static str, message: &str, apply: F) -> Result<R>
    where
        T: Document,
        R: Send,
        F: FnMut(&mut Vec<T>) -> Result<Mutation<R>> + Send,
    {
        let (user, repo) = self.session().await?;
        self.provision(&user, &repo).await?;

        let result = read_modify_write(
            self.store.as_ref(),
            &repo,
            self.config.max_conflict_retries,
            message,
            apply,
        )
        .await;

        match result {
            Ok(committed) => {
                let mut items = committed.items;
                sort_newest_first(&mut items);
                self.cache.set(&user.handle, &items).await;
                self.set_sync(&user.handle, T::KIND, SyncState::Synced);
                info!(
                    component = "shelf",
                    op,
                    kind = %T::KIND,
                    written = committed.written,
                    attempts = committed.attempts,
                    "Mutation committed"
                );
                Ok(committed.output)
            }
            Err(e) => {
                if matches!(e, Error::NotFound(_)) {
                    // Repository or document vanished; provision again next time.
                    self.provisioner.forget(&repo);
                    self.set_sync(&user.handle, T::KIND, SyncState::Unprovisioned);
                }
                if e.is_not_found() || matches!(e, Error::InvalidInput(_)) {
                    debug!(component = "shelf", op, error = %e, "Mutation rejected");
                } else {
                    warn!(component = "shelf", op, error = %e, "Mutation failed");
                }
                Err(e)
            }
        }
    }

    fn lock_sync(&self) -> MutexGuard<'_, HashMap<(String, DocumentKind), SyncState>> {
        self.sync.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_sync(&self, handle: &str, kind: DocumentKind, state: SyncState) {
        self.lock_sync().insert((handle.to_string(), kind), state);
    }

    fn promote_sync(&self, handle: &str, kind: DocumentKind, state: SyncState) {
        let mut sync = self.lock_sync();
        let entry = sync.entry((handle.to_string(), kind)).or_default();
        if *entry == SyncState::Unprovisioned {
            *entry = state;
        }
    }

    #[cfg(test)]
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
