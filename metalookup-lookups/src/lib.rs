//! metalookup-lookups - Cached Reverse Metadata Lookups
//!
//! A [`Lookup`] is one named, versioned reverse index over a single metadata
//! key: given a value, it returns the owning object ID(s), populating an
//! ephemeral cache lazily and keeping it correct through mutation events
//! alone — no transactional coupling to the backing store.
//!
//! # Architecture
//!
//! ```text
//!  caller ──► LookupRegistry ──► Lookup ──► CacheBackend (hit?)
//!                                   │             ▲
//!                                   └──► MetaStore ┘ (miss: query + populate)
//!
//!  MetaStore mutations ──► EventBus ──► Lookup handlers ──► cache deletes
//! ```
//!
//! # Invalidation
//!
//! Three mechanisms keep the cache fresh:
//!
//! 1. **Direct deletes** on `Added` events (a new association may collide
//!    with a cached negative entry).
//! 2. **Two-phase deletes** for updates and deletions: the pre-event stages
//!    the soon-to-be-stale value (still readable from the store) in a keyed
//!    pending table; the completion event drains the table and deletes the
//!    staged entries. Deleting only after the write is durable closes the
//!    race where a concurrent reader repopulates the cache with a value that
//!    is about to go stale.
//! 3. **Epoch bumps**: every cache key is scoped to a cache group embedding
//!    a durable version counter. Incrementing the counter orphans every
//!    prior entry at once; nothing is deleted, the backend's eviction policy
//!    collects the garbage.
//!
//! # Example
//!
//! ```ignore
//! let registry = LookupRegistry::new(store, cache, transient, bus);
//! registry.register("user-by-ext-id", ObjectType::User, "ext_id")?;
//!
//! // …later, on the read path:
//! if let Some(user_id) = registry.do_lookup("user-by-ext-id", "abc") {
//!     // user_id owns ext_id = "abc"
//! }
//! ```

mod lookup;
mod registry;

pub use lookup::{Lookup, CACHE_PREFIX};
pub use registry::LookupRegistry;
