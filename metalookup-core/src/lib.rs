//! metalookup-core - Shared Types for Reverse Metadata Lookups
//!
//! A reverse metadata lookup answers "which object owns metadata value X?"
//! without scanning the backing meta table on every request. This crate holds
//! the types shared by every other workspace member:
//!
//! - `ObjectType`: the fixed set of object kinds a lookup can index
//! - `MetaEvent`: mutation notifications emitted by the metadata store
//! - `LookupError` / `LookupResult`: the error taxonomy
//!
//! The cache and registry logic lives in `metalookup-lookups`; the
//! collaborator boundary (store, cache backend, durable counters) lives in
//! `metalookup-storage`.

mod error;
mod event;
mod object;

pub use error::{LookupError, LookupResult};
pub use event::MetaEvent;
pub use object::{MetaId, ObjectId, ObjectType};
