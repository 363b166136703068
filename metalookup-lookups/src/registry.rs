//! Process-scoped registry mapping lookup names to instances.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use metalookup_core::{LookupResult, ObjectId, ObjectType};
use metalookup_events::EventBus;
use metalookup_storage::{CacheBackend, MetaStore, TransientStore};

use crate::lookup::Lookup;

/// Single source of truth mapping lookup name to [`Lookup`] instance.
///
/// Owned explicitly by the application and passed by reference (or `Arc`) to
/// whatever needs lookup resolution; there is no global state. Registration
/// is idempotent by name, and instances live for the registry's lifetime.
pub struct LookupRegistry {
    lookups: RwLock<HashMap<String, Arc<Lookup>>>,
    store: Arc<dyn MetaStore>,
    cache: Arc<dyn CacheBackend>,
    transient: Arc<dyn TransientStore>,
    bus: Arc<EventBus>,
}

impl LookupRegistry {
    /// Create a registry wired to the given collaborators. Every lookup it
    /// constructs shares them.
    pub fn new(
        store: Arc<dyn MetaStore>,
        cache: Arc<dyn CacheBackend>,
        transient: Arc<dyn TransientStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            lookups: RwLock::new(HashMap::new()),
            store,
            cache,
            transient,
            bus,
        }
    }

    /// Register a lookup, or return the existing instance of that name.
    ///
    /// Idempotent by name only: when `name` is already registered the
    /// supplied `object_type` and `meta_key` are ignored and the existing
    /// instance is returned unchanged. A new instance is subscribed to its
    /// object type's mutation events and to the `flush_{name}` channel
    /// before it becomes visible.
    pub fn register(
        &self,
        name: &str,
        object_type: ObjectType,
        meta_key: &str,
    ) -> LookupResult<Arc<Lookup>> {
        // One write lock around check-and-insert keeps registration
        // idempotent under concurrent callers.
        let mut lookups = self.lookups.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = lookups.get(name) {
            return Ok(existing.clone());
        }

        let lookup = Arc::new(Lookup::new(
            name,
            object_type,
            meta_key,
            self.store.clone(),
            self.cache.clone(),
            self.transient.clone(),
        )?);
        self.bus.subscribe(object_type, lookup.clone());
        self.bus.subscribe_flush(name, lookup.clone());
        lookups.insert(name.to_string(), lookup.clone());
        debug!(lookup = name, %object_type, meta_key, "lookup registered");
        Ok(lookup)
    }

    /// Register from string-typed configuration.
    ///
    /// # Errors
    ///
    /// [`LookupError::InvalidObjectType`] when `object_type` is not one of
    /// `post`, `term`, `user`, `comment`.
    ///
    /// [`LookupError::InvalidObjectType`]: metalookup_core::LookupError::InvalidObjectType
    pub fn register_from_str(
        &self,
        name: &str,
        object_type: &str,
        meta_key: &str,
    ) -> LookupResult<Arc<Lookup>> {
        self.register(name, object_type.parse()?, meta_key)
    }

    /// Fetch a registered lookup by name. `None` is the only signal for an
    /// unregistered name; this never errors.
    pub fn get_instance(&self, name: &str) -> Option<Arc<Lookup>> {
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);
        lookups.get(name).cloned()
    }

    /// Resolve `value` through the named lookup to the first owning object.
    ///
    /// An unregistered name and an unmatched value are both `None`, so the
    /// result can be used directly in conditional logic.
    pub fn do_lookup(&self, name: &str, value: &str) -> Option<ObjectId> {
        self.get_instance(name)?.get(value)
    }

    /// Resolve `value` through the named lookup to all owning objects.
    /// Empty for unmatched values and unregistered names alike.
    pub fn do_lookup_all(&self, name: &str, value: &str) -> Vec<ObjectId> {
        self.get_instance(name)
            .map(|lookup| lookup.get_all(value))
            .unwrap_or_default()
    }

    /// Number of registered lookups.
    pub fn len(&self) -> usize {
        self.lookups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no lookup has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalookup_core::LookupError;
    use metalookup_storage::{InMemoryCacheBackend, InMemoryMetaStore, InMemoryTransientStore};

    struct Fixture {
        registry: LookupRegistry,
        store: Arc<InMemoryMetaStore>,
        bus: Arc<EventBus>,
    }

    impl Fixture {
        fn new() -> Self {
            let bus = Arc::new(EventBus::new());
            let store = Arc::new(InMemoryMetaStore::new(bus.clone()));
            let registry = LookupRegistry::new(
                store.clone(),
                Arc::new(InMemoryCacheBackend::new()),
                Arc::new(InMemoryTransientStore::new()),
                bus.clone(),
            );
            Self {
                registry,
                store,
                bus,
            }
        }
    }

    // P1: registration is idempotent by name, ignoring later type/key.
    #[test]
    fn test_register_is_idempotent_by_name() {
        let fx = Fixture::new();
        let first = fx
            .registry
            .register("user-by-ext-id", ObjectType::User, "ext_id")
            .unwrap();
        let second = fx
            .registry
            .register("user-by-ext-id", ObjectType::Post, "totally_different")
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.object_type(), ObjectType::User);
        assert_eq!(second.meta_key(), "ext_id");
        assert_eq!(fx.registry.len(), 1);
        // Only the first registration subscribed to the bus.
        assert_eq!(fx.bus.subscriber_count(ObjectType::User), 1);
        assert_eq!(fx.bus.subscriber_count(ObjectType::Post), 0);
    }

    #[test]
    fn test_register_from_str_validates_object_type() {
        let fx = Fixture::new();
        let err = fx
            .registry
            .register_from_str("bad", "page", "k")
            .unwrap_err();
        assert_eq!(
            err,
            LookupError::InvalidObjectType {
                got: "page".to_string()
            }
        );
        assert!(fx.registry.is_empty());

        let ok = fx.registry.register_from_str("good", "term", "k").unwrap();
        assert_eq!(ok.object_type(), ObjectType::Term);
    }

    #[test]
    fn test_get_instance_miss_is_none() {
        let fx = Fixture::new();
        assert!(fx.registry.get_instance("nope").is_none());
        assert_eq!(fx.registry.do_lookup("nope", "value"), None);
        assert!(fx.registry.do_lookup_all("nope", "value").is_empty());
    }

    // The spec's example scenario, end to end through the registry.
    #[test]
    fn test_example_scenario() {
        let fx = Fixture::new();
        fx.registry
            .register("user-by-ext-id", ObjectType::User, "ext_id")
            .unwrap();

        fx.store.add_meta(ObjectType::User, 7, "ext_id", "abc");
        assert_eq!(fx.registry.do_lookup("user-by-ext-id", "abc"), Some(7));

        fx.store.update_meta(ObjectType::User, 7, "ext_id", "xyz");

        assert_eq!(fx.registry.do_lookup("user-by-ext-id", "abc"), None);
        assert_eq!(fx.registry.do_lookup("user-by-ext-id", "xyz"), Some(7));
    }

    #[test]
    fn test_flush_through_bus_reaches_registered_lookup() {
        let fx = Fixture::new();
        let lookup = fx
            .registry
            .register("user-by-ext-id", ObjectType::User, "ext_id")
            .unwrap();
        assert_eq!(lookup.current_version(), 0);

        fx.bus.emit_flush("user-by-ext-id");
        assert_eq!(lookup.current_version(), 1);
    }

    #[test]
    fn test_do_lookup_all_returns_every_owner() {
        let fx = Fixture::new();
        fx.registry
            .register("posts-by-series", ObjectType::Post, "series")
            .unwrap();
        fx.store.add_meta(ObjectType::Post, 21, "series", "s1");
        fx.store.add_meta(ObjectType::Post, 22, "series", "s1");

        assert_eq!(fx.registry.do_lookup_all("posts-by-series", "s1"), vec![21, 22]);
        assert_eq!(fx.registry.do_lookup("posts-by-series", "s1"), Some(21));
    }
}
