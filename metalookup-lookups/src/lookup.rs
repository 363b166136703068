//! One named, versioned reverse-index cache over a single metadata key.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, trace};

use metalookup_core::{LookupError, LookupResult, MetaEvent, ObjectId, ObjectType};
use metalookup_events::{FlushSubscriber, MetaEventSubscriber};
use metalookup_storage::{CacheBackend, MetaStore, TransientStore};

/// Cache prefix shared by every lookup's cache group and version counter.
pub const CACHE_PREFIX: &str = "cached-lookups_";

/// Values staged for deletion by a pre-mutation event, keyed by object ID.
///
/// An entry exists only while a mutation is in flight (between the pre-event
/// and its completion). A second pre-event for the same object before the
/// first completion fires accumulates into the same entry, so interleaved
/// mutations still invalidate everything they touched.
#[derive(Debug, Default)]
struct PendingInvalidation {
    values: Vec<String>,
}

/// A cached reverse metadata lookup.
///
/// Lives for the process lifetime once registered; cache entries are created
/// on first query, deleted by mutation events, and orphaned wholesale by
/// [`Lookup::increment_cache_version`].
///
/// If an owning object disappears without a metadata mutation (the object
/// row itself is deleted), no invalidation event exists for it; the flush
/// channel / epoch bump is the escape hatch.
pub struct Lookup {
    name: String,
    object_type: ObjectType,
    meta_key: String,
    meta_table: String,
    meta_table_id_column: String,
    /// Cache group version (the epoch). Part of every cache key this
    /// instance uses; bumping it orphans all prior entries.
    incrementor: RwLock<u64>,
    /// In-flight two-phase invalidations.
    pending: RwLock<HashMap<ObjectId, PendingInvalidation>>,
    store: Arc<dyn MetaStore>,
    cache: Arc<dyn CacheBackend>,
    transient: Arc<dyn TransientStore>,
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lookup")
            .field("name", &self.name)
            .field("object_type", &self.object_type)
            .field("meta_key", &self.meta_key)
            .field("meta_table", &self.meta_table)
            .field("meta_table_id_column", &self.meta_table_id_column)
            .finish_non_exhaustive()
    }
}

impl Lookup {
    /// Create a lookup over `meta_key` for objects of `object_type`.
    ///
    /// Loads the epoch from the transient store (`cached-lookups_{name}_inc`,
    /// absent means 0). Does not subscribe to any events; registration and
    /// bus wiring are the registry's job.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::EmptyName`] for an empty name. Callers
    /// registering from string configuration get
    /// [`LookupError::InvalidObjectType`] from [`ObjectType::from_str`]
    /// before reaching this constructor.
    ///
    /// [`ObjectType::from_str`]: std::str::FromStr::from_str
    pub fn new(
        name: impl Into<String>,
        object_type: ObjectType,
        meta_key: impl Into<String>,
        store: Arc<dyn MetaStore>,
        cache: Arc<dyn CacheBackend>,
        transient: Arc<dyn TransientStore>,
    ) -> LookupResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(LookupError::EmptyName);
        }

        let version_key = format!("{CACHE_PREFIX}{name}_inc");
        let incrementor = transient.get(&version_key).unwrap_or(0);

        Ok(Self {
            meta_table: object_type.meta_table(),
            meta_table_id_column: object_type.id_column(),
            name,
            object_type,
            meta_key: meta_key.into(),
            incrementor: RwLock::new(incrementor),
            pending: RwLock::new(HashMap::new()),
            store,
            cache,
            transient,
        })
    }

    /// Lookup name (registry key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object type this lookup indexes.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Metadata key this lookup indexes.
    pub fn meta_key(&self) -> &str {
        &self.meta_key
    }

    /// Meta table the backing store resolves queries against.
    pub fn meta_table(&self) -> &str {
        &self.meta_table
    }

    /// Owning-ID column on the meta table.
    pub fn meta_table_id_column(&self) -> &str {
        &self.meta_table_id_column
    }

    /// Current cache group version.
    pub fn current_version(&self) -> u64 {
        *self
            .incrementor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache group for the current epoch: `cached-lookups_{name}` with a
    /// `_{version}` suffix once the version is non-zero.
    pub fn cache_group(&self) -> String {
        let incrementor = self.current_version();
        if incrementor == 0 {
            format!("{CACHE_PREFIX}{}", self.name)
        } else {
            format!("{CACHE_PREFIX}{}_{incrementor}", self.name)
        }
    }

    /// Transient-store key of this lookup's durable version counter.
    fn version_key(&self) -> String {
        format!("{CACHE_PREFIX}{}_inc", self.name)
    }

    /// Resolve a value to the first owning object ID, by store order.
    ///
    /// `None` means no object carries this value; the (empty) result is
    /// still cached so repeated misses never hit the store.
    pub fn get(&self, value: &str) -> Option<ObjectId> {
        self.resolve(value).into_iter().next()
    }

    /// Resolve a value to all owning object IDs. Empty means not found.
    ///
    /// The order is stable within one store query only; callers must not
    /// assume it holds across calls if the store mutates in between.
    pub fn get_all(&self, value: &str) -> Vec<ObjectId> {
        self.resolve(value)
    }

    fn resolve(&self, value: &str) -> Vec<ObjectId> {
        let group = self.cache_group();
        // Some(vec![]) is a valid negative hit; only None goes to the store.
        if let Some(ids) = self.cache.get(value, &group) {
            trace!(lookup = %self.name, value, "cache hit");
            return ids;
        }

        let ids = self
            .store
            .find_object_ids(self.object_type, &self.meta_key, value);
        debug!(
            lookup = %self.name,
            value,
            matches = ids.len(),
            "cache miss, populated from store"
        );
        self.cache.set(value, &group, ids.clone());
        ids
    }

    /// Bump the cache group version, orphaning every entry of the current
    /// epoch. Persists the new version durably and mirrors it in memory.
    /// Returns the new version.
    pub fn increment_cache_version(&self) -> u64 {
        let mut incrementor = self
            .incrementor
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *incrementor += 1;
        self.transient.set(&self.version_key(), *incrementor);
        info!(lookup = %self.name, version = *incrementor, "cache version bumped");
        *incrementor
    }

    /// Stage values for deletion once the in-flight mutation completes.
    fn stage(&self, object_id: ObjectId, values: impl IntoIterator<Item = String>) {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        pending.entry(object_id).or_default().values.extend(values);
    }

    /// Delete every staged value and clear the pending table. Firing clears
    /// the staged state, so a completion event with nothing staged is a
    /// no-op and repeated completions cannot double-fire.
    fn drain_pending(&self) {
        let staged: Vec<String> = {
            let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *pending)
                .into_values()
                .flat_map(|entry| entry.values)
                .collect()
        };
        if staged.is_empty() {
            return;
        }

        let group = self.cache_group();
        for value in staged {
            debug!(lookup = %self.name, value = %value, "invalidating cache entry");
            self.cache.delete(&value, &group);
        }
    }

    /// Number of objects with staged invalidations (test observability).
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MetaEventSubscriber for Lookup {
    /// The invalidation core. The bus already routes by object type; events
    /// for other meta keys on the same type are filtered out here.
    fn on_meta_event(&self, event: &MetaEvent) {
        match event {
            MetaEvent::Added { key, value, .. } => {
                if key != &self.meta_key {
                    trace!(lookup = %self.name, key = %key, "ignoring add for other key");
                    return;
                }
                // A fresh association can collide with a cached negative
                // entry for the same value; the insert is already durable,
                // so delete immediately.
                self.cache.delete(value, &self.cache_group());
            }
            MetaEvent::Updating {
                object_id,
                key,
                value,
                ..
            } => {
                if key != &self.meta_key {
                    trace!(lookup = %self.name, key = %key, "ignoring update for other key");
                    return;
                }
                // The old value is only observable before the write lands.
                // Stage it (and the incoming value) now; delete on the
                // completion event, after the write is durable.
                let mut stale = Vec::with_capacity(2);
                if let Some(old) = self
                    .store
                    .get_current_value(self.object_type, *object_id, key)
                {
                    stale.push(old);
                }
                stale.push(value.clone());
                self.stage(*object_id, stale);
            }
            MetaEvent::Deleting {
                object_id, key, ..
            } => {
                if key != &self.meta_key {
                    trace!(lookup = %self.name, key = %key, "ignoring delete for other key");
                    return;
                }
                if let Some(old) = self
                    .store
                    .get_current_value(self.object_type, *object_id, key)
                {
                    self.stage(*object_id, [old]);
                }
            }
            MetaEvent::Updated { .. } | MetaEvent::Deleted { .. } => {
                self.drain_pending();
            }
        }
    }
}

impl FlushSubscriber for Lookup {
    fn on_flush(&self) {
        self.increment_cache_version();
    }
}
