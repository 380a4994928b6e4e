//! Error types for store writes, persistence and constructible defaults.
//!
//! None of these ever escape as a panic. Write paths hand a [`StoreError`]
//! back to the caller, while [`PersistError`] and [`ConstructError`] are
//! contained where they happen and only reported through `tracing`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Why a write (or an action lookup) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("property \"{field}\" is not defined in schema")]
    UnknownField { field: String },

    #[error("invalid type for \"{field}\": expected {expected}, got {found}")]
    SchemaViolation {
        field: String,
        expected: String,
        found: String,
    },

    #[error("write to \"{field}\" exceeds the nested notification limit of {limit}")]
    ReentrancyLimit { field: String, limit: usize },

    #[error("action \"{name}\" is not defined")]
    UnknownAction { name: String },
}

impl StoreError {
    #[must_use]
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// The field the rejected write targeted, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field }
            | Self::SchemaViolation { field, .. }
            | Self::ReentrancyLimit { field, .. } => Some(field),
            Self::UnknownAction { .. } => None,
        }
    }
}

/// Failure talking to a [`Storage`](crate::persist::Storage) backend.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persisted state for \"{key}\" is not a JSON object")]
    NotAnObject { key: String },

    #[error("storage backend failure: {message}")]
    Backend { message: String },
}

impl PersistError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// A [`Constructible`](crate::schema::Constructible) type refused to build
/// its zero-argument default.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to construct {type_name}: {reason}")]
pub struct ConstructError {
    pub type_name: &'static str,
    pub reason: String,
}

impl ConstructError {
    #[must_use]
    pub fn new<T: ?Sized>(reason: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = StoreError::unknown_field("nope");
        assert_eq!(err.to_string(), "property \"nope\" is not defined in schema");
        assert_eq!(err.field(), Some("nope"));

        let err = StoreError::SchemaViolation {
            field: "age".into(),
            expected: "number".into(),
            found: "string".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid type for \"age\": expected number, got string"
        );
    }

    #[test]
    fn construct_error_records_type_name() {
        struct Widget;
        let err = ConstructError::new::<Widget>("no default");
        assert!(err.type_name.ends_with("Widget"));
        assert!(err.to_string().contains("no default"));
    }
}
