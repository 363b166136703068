//! In-memory metadata store with an event-emitting write path.
//!
//! The production write path lives outside this workspace; this store exists
//! so the invalidation pipeline can be driven end to end. Its write
//! operations reproduce the pipeline contract: pre-event, then the write,
//! then the completion event, with no internal lock held while handlers run
//! (handlers re-enter the store through
//! [`MetaStore::get_current_value`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use metalookup_core::{MetaEvent, MetaId, ObjectId, ObjectType};
use metalookup_events::EventBus;

use crate::traits::MetaStore;

#[derive(Debug, Clone)]
struct MetaRow {
    meta_id: MetaId,
    object_type: ObjectType,
    object_id: ObjectId,
    key: String,
    value: String,
}

/// In-memory [`MetaStore`] wired to an [`EventBus`].
pub struct InMemoryMetaStore {
    rows: RwLock<Vec<MetaRow>>,
    next_meta_id: AtomicU64,
    queries: AtomicU64,
    bus: Arc<EventBus>,
}

impl InMemoryMetaStore {
    /// Create an empty store announcing mutations on `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_meta_id: AtomicU64::new(1),
            queries: AtomicU64::new(0),
            bus,
        }
    }

    /// Insert a metadata row, then emit [`MetaEvent::Added`].
    pub fn add_meta(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        key: &str,
        value: &str,
    ) -> MetaId {
        let meta_id = self.next_meta_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
            rows.push(MetaRow {
                meta_id,
                object_type,
                object_id,
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.bus.emit(&MetaEvent::Added {
            object_type,
            meta_id,
            object_id,
            key: key.to_string(),
            value: value.to_string(),
        });
        meta_id
    }

    /// Update every row matching `(object_id, key)` to `value`.
    ///
    /// Emits [`MetaEvent::Updating`] before the write lands and
    /// [`MetaEvent::Updated`] once it has. Falls back to [`Self::add_meta`]
    /// when no row exists, matching the upsert behavior of metadata stores.
    pub fn update_meta(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        key: &str,
        value: &str,
    ) -> MetaId {
        let existing_id = {
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            rows.iter()
                .find(|row| {
                    row.object_type == object_type && row.object_id == object_id && row.key == key
                })
                .map(|row| row.meta_id)
        };
        let Some(meta_id) = existing_id else {
            return self.add_meta(object_type, object_id, key, value);
        };

        self.bus.emit(&MetaEvent::Updating {
            object_type,
            meta_id,
            object_id,
            key: key.to_string(),
            value: value.to_string(),
        });
        {
            let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
            for row in rows.iter_mut() {
                if row.object_type == object_type && row.object_id == object_id && row.key == key {
                    row.value = value.to_string();
                }
            }
        }
        self.bus.emit(&MetaEvent::Updated { object_type });
        meta_id
    }

    /// Delete every row matching `(object_id, key)`.
    ///
    /// Emits [`MetaEvent::Deleting`] with the doomed row IDs before removal
    /// and [`MetaEvent::Deleted`] afterwards. A miss emits nothing.
    pub fn delete_meta(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        key: &str,
    ) -> Vec<MetaId> {
        let meta_ids: Vec<MetaId> = {
            let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
            rows.iter()
                .filter(|row| {
                    row.object_type == object_type && row.object_id == object_id && row.key == key
                })
                .map(|row| row.meta_id)
                .collect()
        };
        if meta_ids.is_empty() {
            return meta_ids;
        }

        self.bus.emit(&MetaEvent::Deleting {
            object_type,
            meta_ids: meta_ids.clone(),
            object_id,
            key: key.to_string(),
        });
        {
            let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
            rows.retain(|row| {
                !(row.object_type == object_type && row.object_id == object_id && row.key == key)
            });
        }
        self.bus.emit(&MetaEvent::Deleted { object_type });
        meta_ids
    }

    /// Number of `find_object_ids` queries served. Lets tests assert that
    /// the cache absorbed repeat lookups.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl MetaStore for InMemoryMetaStore {
    fn find_object_ids(
        &self,
        object_type: ObjectType,
        meta_key: &str,
        value: &str,
    ) -> Vec<ObjectId> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        // Insertion order doubles as the store-defined stable order.
        rows.iter()
            .filter(|row| {
                row.object_type == object_type && row.key == meta_key && row.value == value
            })
            .map(|row| row.object_id)
            .collect()
    }

    fn get_current_value(
        &self,
        object_type: ObjectType,
        object_id: ObjectId,
        meta_key: &str,
    ) -> Option<String> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        rows.iter()
            .find(|row| {
                row.object_type == object_type
                    && row.object_id == object_id
                    && row.key == meta_key
            })
            .map(|row| row.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalookup_events::MetaEventSubscriber;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<MetaEvent>>,
    }

    impl MetaEventSubscriber for Recorder {
        fn on_meta_event(&self, event: &MetaEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    fn store_with_recorder() -> (InMemoryMetaStore, Arc<Recorder>) {
        let bus = Arc::new(EventBus::new());
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(ObjectType::User, recorder.clone());
        (InMemoryMetaStore::new(bus), recorder)
    }

    #[test]
    fn test_find_returns_insertion_order() {
        let (store, _) = store_with_recorder();
        store.add_meta(ObjectType::User, 7, "ext_id", "abc");
        store.add_meta(ObjectType::User, 3, "ext_id", "abc");
        store.add_meta(ObjectType::User, 9, "other", "abc");

        let ids = store.find_object_ids(ObjectType::User, "ext_id", "abc");
        assert_eq!(ids, vec![7, 3]);
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn test_update_pipeline_order() {
        let (store, recorder) = store_with_recorder();
        store.add_meta(ObjectType::User, 7, "ext_id", "abc");
        store.update_meta(ObjectType::User, 7, "ext_id", "xyz");

        let events = recorder.seen.lock().unwrap().clone();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], MetaEvent::Added { .. }));
        assert!(
            matches!(events[1], MetaEvent::Updating { ref value, .. } if value.as_str() == "xyz"),
            "pre-event must carry the incoming value"
        );
        assert!(matches!(events[2], MetaEvent::Updated { .. }));
        assert_eq!(
            store.get_current_value(ObjectType::User, 7, "ext_id"),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn test_update_of_missing_row_adds() {
        let (store, recorder) = store_with_recorder();
        store.update_meta(ObjectType::User, 5, "ext_id", "fresh");

        let events = recorder.seen.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MetaEvent::Added { .. }));
    }

    #[test]
    fn test_delete_pipeline_carries_doomed_ids() {
        let (store, recorder) = store_with_recorder();
        let meta_id = store.add_meta(ObjectType::User, 7, "ext_id", "abc");
        let deleted = store.delete_meta(ObjectType::User, 7, "ext_id");
        assert_eq!(deleted, vec![meta_id]);

        let events = recorder.seen.lock().unwrap().clone();
        assert!(
            matches!(events[1], MetaEvent::Deleting { ref meta_ids, .. } if *meta_ids == vec![meta_id])
        );
        assert!(matches!(events[2], MetaEvent::Deleted { .. }));
        assert_eq!(store.get_current_value(ObjectType::User, 7, "ext_id"), None);
    }

    #[test]
    fn test_delete_miss_emits_nothing() {
        let (store, recorder) = store_with_recorder();
        assert!(store.delete_meta(ObjectType::User, 1, "ext_id").is_empty());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_old_value_observable_during_pre_event() {
        // The two-phase protocol reads the current value from inside the
        // Updating handler; the store must still serve the old value there.
        struct PreEventProbe {
            store: Mutex<Option<Arc<InMemoryMetaStore>>>,
            observed: Mutex<Option<String>>,
        }
        impl MetaEventSubscriber for PreEventProbe {
            fn on_meta_event(&self, event: &MetaEvent) {
                if let MetaEvent::Updating {
                    object_type,
                    object_id,
                    key,
                    ..
                } = event
                {
                    let store = self.store.lock().unwrap().clone().unwrap();
                    *self.observed.lock().unwrap() =
                        store.get_current_value(*object_type, *object_id, key);
                }
            }
        }

        let bus = Arc::new(EventBus::new());
        let probe = Arc::new(PreEventProbe {
            store: Mutex::new(None),
            observed: Mutex::new(None),
        });
        bus.subscribe(ObjectType::User, probe.clone());
        let store = Arc::new(InMemoryMetaStore::new(bus));
        *probe.store.lock().unwrap() = Some(store.clone());

        store.add_meta(ObjectType::User, 7, "ext_id", "old");
        store.update_meta(ObjectType::User, 7, "ext_id", "new");

        assert_eq!(*probe.observed.lock().unwrap(), Some("old".to_string()));
    }
}
