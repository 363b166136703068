//! metalookup-storage - Collaborator Boundary and In-Memory Backends
//!
//! The lookup core treats its surroundings as three collaborators, each
//! specified as a trait:
//!
//! - [`MetaStore`]: the persistent metadata store (point lookup by key and
//!   value, current-value reads). Its write path is external; it announces
//!   mutations on the event bus.
//! - [`CacheBackend`]: the ephemeral key-value cache, namespaced by group.
//!   Entries may be evicted at any time.
//! - [`TransientStore`]: the durable counter store for cache-group versions.
//!   Survives cache eviction.
//!
//! In-memory implementations of all three are provided. They are reference
//! backends: real deployments swap in their own store/cache, the in-memory
//! meta store additionally drives the full pre-event / write / post-event
//! pipeline so the invalidation protocol can be exercised end to end.

mod memory;
mod meta_store;
mod traits;

pub use memory::{InMemoryCacheBackend, InMemoryTransientStore};
pub use meta_store::InMemoryMetaStore;
pub use traits::{CacheBackend, CacheStats, MetaStore, TransientStore};
