//! Error types for property marshaling
//!
//! Every variant names the owning type and, where one is involved, the field.
//! `TypeMismatch` additionally carries the expected and actual type labels and
//! the offending value so a diagnostic can be rendered without re-deriving
//! any state.

use crate::config::ConfigError;
use crate::value::Value;

/// Error type for definition, marshaling, cache and conversion operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bulk-import or definition-import argument is not map-like
    #[error("Invalid input for {owner}: {reason}")]
    InvalidInput { owner: String, reason: String },

    /// Read of an undeclared field, or strict-mode write of one
    #[error("Unknown property: {owner}.{field}")]
    UnknownProperty { owner: String, field: String },

    /// The (possibly coerced) value still fails the declared type
    #[error("Type mismatch for {owner}.{field}: expected {expected}, got {actual} ({value})")]
    TypeMismatch {
        owner: String,
        field: String,
        expected: String,
        actual: String,
        value: Value,
    },

    /// An object was assigned into itself, or a strict conversion met a cycle
    #[error("Circular reference: {owner}.{field}")]
    CircularReference { owner: String, field: String },

    /// Accessor name passed to `call` does not map to get/set/has
    #[error("Unknown method: {owner}::{method}")]
    UnknownMethod { owner: String, method: String },

    /// No metadata is registered for the requested entity type
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A cache snapshot failed to deserialize into a well-formed snapshot
    #[error("Cache snapshot corrupt: {0}")]
    CacheCorrupt(String),

    /// Configuration or descriptor file failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for marshaling operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a `TypeMismatch` from the offending value
    pub fn type_mismatch(
        owner: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::TypeMismatch {
            owner: owner.into(),
            field: field.into(),
            expected: expected.into(),
            actual: value.type_label(),
            value,
        }
    }

    /// Build an `UnknownProperty`
    pub fn unknown_property(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownProperty {
            owner: owner.into(),
            field: field.into(),
        }
    }

    /// Field name this error is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownProperty { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::CircularReference { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::type_mismatch("Person", "age", "int", Value::from("12abc"));
        let msg = err.to_string();
        assert!(msg.contains("Person.age"));
        assert!(msg.contains("expected int"));
        assert!(msg.contains("got string"));
        assert!(msg.contains("\"12abc\""));
        assert_eq!(err.field(), Some("age"));
    }

    #[test]
    fn test_cache_corrupt_has_no_field() {
        let err = Error::CacheCorrupt("bad blob".to_string());
        assert_eq!(err.field(), None);
    }
}
