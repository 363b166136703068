//! Collaborator traits and cache statistics.

use metalookup_core::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

/// Read-side contract of the persistent metadata store.
///
/// The write path is external to this workspace; mutations are observed only
/// through [`MetaEvent`]s on the bus. Backend failures (connectivity,
/// timeouts) are a collaborator concern and surface before these calls
/// return.
///
/// [`MetaEvent`]: metalookup_core::MetaEvent
pub trait MetaStore: Send + Sync {
    /// All object IDs whose `meta_key` equals `value` for the given type.
    ///
    /// The order is store-defined but stable within one query; an empty
    /// vector means no match. One row per matching meta row, so an object
    /// holding the same key/value twice appears twice.
    fn find_object_ids(&self, object_type: ObjectType, meta_key: &str, value: &str)
        -> Vec<ObjectId>;

    /// Current value of `meta_key` for one object, or `None` if absent.
    ///
    /// Two-phase invalidation calls this from the pre-mutation event, while
    /// the soon-to-be-old value is still observable.
    fn get_current_value(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        meta_key: &str,
    ) -> Option<String>;
}

/// Ephemeral key-value cache, namespaced by group.
///
/// Groups provide namespace isolation only; no cross-group operations exist.
/// `Some(vec![])` is a valid (negative) hit — only `None` is a miss.
pub trait CacheBackend: Send + Sync {
    /// Fetch the entry for `key` within `group`.
    fn get(&self, key: &str, group: &str) -> Option<Vec<ObjectId>>;

    /// Store `ids` under `key` within `group`, replacing any prior entry.
    fn set(&self, key: &str, group: &str, ids: Vec<ObjectId>);

    /// Remove the entry for `key` within `group` if present. Idempotent:
    /// deleting an absent entry is not an error.
    fn delete(&self, key: &str, group: &str);
}

/// Durable counter store for cache-group versions.
///
/// Unlike the ephemeral cache, values here must survive cache eviction: a
/// lost counter would silently resurrect pre-bump cache groups.
pub trait TransientStore: Send + Sync {
    /// Fetch a counter, or `None` if never set.
    fn get(&self, key: &str) -> Option<u64>;

    /// Persist a counter.
    fn set(&self, key: &str, value: u64);
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits (including negative hits).
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries written.
    pub sets: u64,
    /// Number of delete calls that removed an entry.
    pub deletes: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 30,
            misses: 10,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);

        let empty = CacheStats::default();
        assert!((empty.hit_rate() - 0.0).abs() < 0.001);
    }
}
