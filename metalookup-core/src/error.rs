//! Error types for lookup operations.
//!
//! A registry miss or an unmatched value is *not* an error: both surface as
//! `Option::None`/empty so callers can branch on them directly. The variants
//! here are construction-time failures only.

use thiserror::Error;

/// Lookup construction and registration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("invalid object type `{got}`: supported types are post, term, user, comment")]
    InvalidObjectType { got: String },

    #[error("lookup name must not be empty")]
    EmptyName,
}

/// Result type alias for lookup operations.
pub type LookupResult<T> = Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LookupError::InvalidObjectType {
            got: "attachment".to_string(),
        };
        assert!(err.to_string().contains("attachment"));
        assert!(err.to_string().contains("post, term, user, comment"));
    }
}
