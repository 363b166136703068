//! Event bus implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use metalookup_core::{MetaEvent, ObjectType};

/// Receiver of metadata mutation events for one object type.
///
/// Implementations must filter on the meta key themselves: the bus routes by
/// object type only, so a subscriber sees every mutation of its object type,
/// including keys it does not index.
pub trait MetaEventSubscriber: Send + Sync {
    /// Handle one mutation event. Called synchronously on the emitter's
    /// thread; implementations must not block on the bus.
    fn on_meta_event(&self, event: &MetaEvent);
}

/// Receiver of explicit "flush this lookup" signals.
pub trait FlushSubscriber: Send + Sync {
    /// Handle a flush request for the lookup this subscriber was registered
    /// under.
    fn on_flush(&self);
}

/// Process-scoped event bus.
///
/// Mutation events are routed per object type; flush signals per lookup
/// name. Subscriptions are append-only for the process lifetime (lookups are
/// never destroyed), so there is no unsubscribe operation.
#[derive(Default)]
pub struct EventBus {
    meta: RwLock<HashMap<ObjectType, Vec<Arc<dyn MetaEventSubscriber>>>>,
    flush: RwLock<HashMap<String, Vec<Arc<dyn FlushSubscriber>>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all mutation events of one object type.
    pub fn subscribe(&self, object_type: ObjectType, subscriber: Arc<dyn MetaEventSubscriber>) {
        let mut meta = self.meta.write().unwrap_or_else(PoisonError::into_inner);
        meta.entry(object_type).or_default().push(subscriber);
    }

    /// Subscribe to flush signals for the named lookup.
    pub fn subscribe_flush(&self, name: &str, subscriber: Arc<dyn FlushSubscriber>) {
        let mut flush = self.flush.write().unwrap_or_else(PoisonError::into_inner);
        flush.entry(name.to_string()).or_default().push(subscriber);
    }

    /// Dispatch a mutation event to every subscriber of its object type, in
    /// subscription order.
    pub fn emit(&self, event: &MetaEvent) {
        // Snapshot before dispatch: handlers may re-enter the bus (e.g. a
        // registration triggered from inside a handler) or call back into
        // the store that emitted this event.
        let subscribers = {
            let meta = self.meta.read().unwrap_or_else(PoisonError::into_inner);
            meta.get(&event.object_type()).cloned().unwrap_or_default()
        };
        for subscriber in subscribers {
            subscriber.on_meta_event(event);
        }
    }

    /// Dispatch a flush signal to every subscriber of the named lookup.
    pub fn emit_flush(&self, name: &str) {
        let subscribers = {
            let flush = self.flush.read().unwrap_or_else(PoisonError::into_inner);
            flush.get(name).cloned().unwrap_or_default()
        };
        for subscriber in subscribers {
            subscriber.on_flush();
        }
    }

    /// Number of mutation subscribers for an object type.
    pub fn subscriber_count(&self, object_type: ObjectType) -> usize {
        let meta = self.meta.read().unwrap_or_else(PoisonError::into_inner);
        meta.get(&object_type).map(Vec::len).unwrap_or(0)
    }
}
