//! metalookup-events - Synchronous Event Bus
//!
//! Routes [`MetaEvent`] mutation notifications to subscribers by object type,
//! and "flush" signals to subscribers by lookup name. Dispatch happens on the
//! emitter's thread, in subscription order, with no buffering: a store that
//! emits pre-event, performs its write, then emits the completion event gives
//! handlers exactly that pipeline order. Two-phase cache invalidation depends
//! on it.
//!
//! Subscribers are routed by object type only; filtering on the meta key is
//! the handler's responsibility. That filter-in-handler split is the dispatch
//! contract between the bus and the lookup layer.
//!
//! [`MetaEvent`]: metalookup_core::MetaEvent

mod bus;

pub use bus::{EventBus, FlushSubscriber, MetaEventSubscriber};
