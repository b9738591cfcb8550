//! In-process session cache.
//!
//! Bounded LRU map from the serialized credential claims to the resolved
//! session. One instance is constructed at process start and shared by all
//! in-flight requests; it is never torn down, only evicted under capacity
//! pressure. Entries carry no expiry of their own: staleness is bounded by
//! the credential's lifetime and by eviction.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::auth::session::ResolvedSession;

/// Default maximum number of cached sessions.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded LRU cache of resolved sessions.
pub struct SessionCache {
    entries: Mutex<LruCache<String, ResolvedSession>>,
}

impl SessionCache {
    /// Create a cache with the given capacity (entries, not bytes).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a session by serialized claims, marking it most recently used.
    pub async fn get(&self, key: &str) -> Option<ResolvedSession> {
        let mut entries = self.entries.lock().await;
        entries.get(key).cloned()
    }

    /// Store a resolved session under its serialized claims.
    ///
    /// Two requests racing to insert the same key both write the same
    /// derivable value, so last-writer-wins is fine.
    pub async fn put(&self, key: String, session: ResolvedSession) {
        let mut entries = self.entries.lock().await;
        entries.put(key, session);
    }

    /// Number of cached sessions.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
