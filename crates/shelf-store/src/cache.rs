//! Local cache layer.
//!
//! A time-boxed mirror of both documents, keyed by user handle. It serves
//! instant reads while a refresh is in flight and is the last resort when
//! the remote store cannot be reached. The cache never fails an operation:
//! storage errors and unreadable entries are logged and count as a miss.
//!
//! Keys: `shelf:{handle}:stars`, `shelf:{handle}:notes`, plus
//! `shelf:last_user` recording the most recent signed-in handle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use shelf_core::defaults::CACHE_KEY_PREFIX;
use shelf_core::{sort_newest_first, CacheStorage, Clock, Document, DocumentKind};

#[derive(Serialize)]
struct EntryRef<'a, T> {
    cached_at: DateTime<Utc>,
    items: &'a [T],
}

#[derive(Deserialize)]
struct Entry<T> {
    cached_at: DateTime<Utc>,
    items: Vec<T>,
}

/// A cached collection and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCollection<T> {
    pub items: Vec<T>,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedCollection<T> {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }
}

/// Cache of both collections over an injected storage and clock.
pub struct LocalCache {
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            storage,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Storage key of a document for a user.
    pub fn key(scope: &str, kind: DocumentKind) -> String {
        format!("{}:{}:{}", CACHE_KEY_PREFIX, scope, kind)
    }

    fn last_user_key() -> String {
        format!("{}:last_user", CACHE_KEY_PREFIX)
    }

    /// Fresh entry only: a miss when absent or older than the TTL.
    pub async fn get<T: Document>(&self, scope: &str) -> Option<Vec<T>> {
        let cached = self.get_stale::<T>(scope).await?;
        let age = cached.age(self.clock.now());
        if age > self.ttl {
            debug!(
                component = "cache",
                kind = %T::KIND,
                age_secs = age.num_seconds(),
                "Cache entry expired"
            );
            return None;
        }
        debug!(component = "cache", kind = %T::KIND, "Cache HIT");
        Some(cached.items)
    }

    /// Entry of any age, sorted newest first.
    pub async fn get_stale<T: Document>(&self, scope: &str) -> Option<CachedCollection<T>> {
        let key = Self::key(scope, T::KIND);
        let raw = match self.storage.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(component = "cache", key = %key, "Cache MISS");
                return None;
            }
            Err(e) => {
                warn!(component = "cache", key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<Entry<T>>(&raw) {
            Ok(entry) => {
                let mut items = entry.items;
                sort_newest_first(&mut items);
                Some(CachedCollection {
                    items,
                    cached_at: entry.cached_at,
                })
            }
            Err(e) => {
                warn!(component = "cache", key = %key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    /// Store a collection stamped with the current time.
    pub async fn set<T: Document>(&self, scope: &str, items: &[T]) {
        let key = Self::key(scope, T::KIND);
        let entry = EntryRef {
            cached_at: self.clock.now(),
            items,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(component = "cache", key = %key, error = %e, "Cache serialization failed");
                return;
            }
        };
        if let Err(e) = self.storage.set(&key, raw).await {
            warn!(component = "cache", key = %key, error = %e, "Cache write failed");
        } else {
            debug!(component = "cache", key = %key, item_count = items.len(), "Cache SET");
        }
    }

    pub async fn invalidate(&self, scope: &str, kind: DocumentKind) {
        let key = Self::key(scope, kind);
        if let Err(e) = self.storage.remove(&key).await {
            warn!(component = "cache", key = %key, error = %e, "Cache invalidation failed");
        }
    }

    /// Drop both documents of a user.
    pub async fn purge(&self, scope: &str) {
        for kind in DocumentKind::ALL {
            self.invalidate(scope, kind).await;
        }
    }

    /// Record the most recent signed-in handle.
    pub async fn remember_user(&self, handle: &str) {
        if self.last_user().await.as_deref() == Some(handle) {
            return;
        }
        if let Err(e) = self
            .storage
            .set(&Self::last_user_key(), handle.to_string())
            .await
        {
            warn!(component = "cache", error = %e, "Failed to record last user");
        }
    }

    /// Handle of the most recent signed-in user, if any.
    pub async fn last_user(&self) -> Option<String> {
        match self.storage.get(&Self::last_user_key()).await {
            Ok(handle) => handle.filter(|h| !h.is_empty()),
            Err(e) => {
                warn!(component = "cache", error = %e, "Failed to read last user");
                None
            }
        }
    }
}
