//! In-memory cache backend and transient store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use metalookup_core::ObjectId;

use crate::traits::{CacheBackend, CacheStats, TransientStore};

#[derive(Debug, Clone)]
struct CachedEntry {
    ids: Vec<ObjectId>,
    // Retained for eviction policies and debugging; the invalidation
    // protocol itself is epoch-based, not time-based.
    #[allow(dead_code)]
    cached_at: DateTime<Utc>,
}

/// In-memory [`CacheBackend`] keyed by `(group, key)`.
///
/// Never evicts on its own; orphaned epochs accumulate until the process
/// exits, which mirrors how a real backend would hold them until its
/// eviction policy fires.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<(String, String), CachedEntry>>,
    stats: RwLock<CacheStats>,
}

impl InMemoryCacheBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of usage statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Inspect an entry without touching hit/miss counters. Test and
    /// debugging aid: lets callers verify that orphaned epoch entries were
    /// left in place rather than deleted.
    pub fn peek(&self, key: &str, group: &str) -> Option<Vec<ObjectId>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(group.to_string(), key.to_string()))
            .map(|entry| entry.ids.clone())
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get(&self, key: &str, group: &str) -> Option<Vec<ObjectId>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries
            .get(&(group.to_string(), key.to_string()))
            .map(|entry| entry.ids.clone());

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    fn set(&self, key: &str, group: &str, ids: Vec<ObjectId>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            (group.to_string(), key.to_string()),
            CachedEntry {
                ids,
                cached_at: Utc::now(),
            },
        );
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.sets += 1;
        stats.entry_count = entries.len() as u64;
    }

    fn delete(&self, key: &str, group: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries
            .remove(&(group.to_string(), key.to_string()))
            .is_some();
        if removed {
            let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
            stats.deletes += 1;
            stats.entry_count = entries.len() as u64;
        }
    }
}

/// In-memory [`TransientStore`].
#[derive(Default)]
pub struct InMemoryTransientStore {
    counters: RwLock<HashMap<String, u64>>,
}

impl InMemoryTransientStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransientStore for InMemoryTransientStore {
    fn get(&self, key: &str) -> Option<u64> {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        counters.get(key).copied()
    }

    fn set(&self, key: &str, value: u64) {
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters.insert(key.to_string(), value);
    }
}
