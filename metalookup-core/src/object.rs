//! Object type enumeration and identifier aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LookupError;

/// Identifier of an object row (post, user, term or comment).
pub type ObjectId = u64;

/// Identifier of a single metadata row.
pub type MetaId = u64;

/// The kind of object a metadata row belongs to.
///
/// Determines which meta table a lookup queries and which mutation events
/// it subscribes to. The set is closed; anything else fails parsing with
/// [`LookupError::InvalidObjectType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Post,
    User,
    Term,
    Comment,
}

impl ObjectType {
    /// All supported object types, in declaration order.
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Post,
        ObjectType::User,
        ObjectType::Term,
        ObjectType::Comment,
    ];

    /// Lower-case name of this object type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Post => "post",
            ObjectType::User => "user",
            ObjectType::Term => "term",
            ObjectType::Comment => "comment",
        }
    }

    /// Name of the meta table holding this type's metadata rows.
    pub fn meta_table(&self) -> String {
        format!("{}meta", self.as_str())
    }

    /// Column on the meta table referencing the owning object.
    pub fn id_column(&self) -> String {
        format!("{}_id", self.as_str())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ObjectType::Post),
            "user" => Ok(ObjectType::User),
            "term" => Ok(ObjectType::Term),
            "comment" => Ok(ObjectType::Comment),
            other => Err(LookupError::InvalidObjectType {
                got: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_round_trip() {
        for object_type in ObjectType::ALL {
            let parsed: ObjectType = object_type.as_str().parse().unwrap();
            assert_eq!(parsed, object_type);
        }
    }

    #[test]
    fn test_invalid_object_type_rejected() {
        let err = "page".parse::<ObjectType>().unwrap_err();
        assert_eq!(
            err,
            LookupError::InvalidObjectType {
                got: "page".to_string()
            }
        );
    }

    #[test]
    fn test_meta_table_naming() {
        assert_eq!(ObjectType::Post.meta_table(), "postmeta");
        assert_eq!(ObjectType::User.meta_table(), "usermeta");
        assert_eq!(ObjectType::Term.id_column(), "term_id");
        assert_eq!(ObjectType::Comment.id_column(), "comment_id");
    }

    proptest::proptest! {
        #[test]
        fn prop_unknown_strings_never_parse(s in "\\PC*") {
            let known = ObjectType::ALL.iter().any(|t| t.as_str() == s);
            proptest::prop_assert_eq!(s.parse::<ObjectType>().is_ok(), known);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ObjectType::User).unwrap();
        assert_eq!(json, "\"user\"");
        let back: ObjectType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ObjectType::User);
    }
}
