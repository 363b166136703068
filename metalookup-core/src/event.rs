//! Mutation events emitted by the metadata store.
//!
//! Mutations follow a fixed pipeline per object: pre-event, then the store
//! write, then a completion event. Two-phase invalidation relies on this
//! ordering — the old value is only observable before the write lands, while
//! cache deletion must only happen after it is durable.

use serde::{Deserialize, Serialize};

use crate::object::{MetaId, ObjectId, ObjectType};

/// A metadata mutation notification.
///
/// `Added` fires after the insert is committed. `Updating`/`Deleting` fire
/// *before* the write lands and carry the affected object; the matching
/// `Updated`/`Deleted` completion fires once the write is durable and carries
/// only the object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaEvent {
    /// A metadata row was inserted (fires post-commit).
    Added {
        object_type: ObjectType,
        meta_id: MetaId,
        object_id: ObjectId,
        key: String,
        value: String,
    },
    /// A metadata row is about to be updated; `value` is the incoming value.
    Updating {
        object_type: ObjectType,
        meta_id: MetaId,
        object_id: ObjectId,
        key: String,
        value: String,
    },
    /// An update completed.
    Updated { object_type: ObjectType },
    /// Metadata rows are about to be deleted.
    Deleting {
        object_type: ObjectType,
        meta_ids: Vec<MetaId>,
        object_id: ObjectId,
        key: String,
    },
    /// A deletion completed.
    Deleted { object_type: ObjectType },
}

impl MetaEvent {
    /// The object type this event applies to; used for bus routing.
    pub fn object_type(&self) -> ObjectType {
        match self {
            MetaEvent::Added { object_type, .. }
            | MetaEvent::Updating { object_type, .. }
            | MetaEvent::Updated { object_type }
            | MetaEvent::Deleting { object_type, .. }
            | MetaEvent::Deleted { object_type } => *object_type,
        }
    }

    /// True for the post-write completion events.
    pub fn is_completion(&self) -> bool {
        matches!(self, MetaEvent::Updated { .. } | MetaEvent::Deleted { .. })
    }
}
