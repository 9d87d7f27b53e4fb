//! Error types for schema lookups and registry construction.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building or querying the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No object config registered under this type.
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    /// Neither an object type nor a struct has this name.
    #[error("unknown struct or object type: {0}")]
    UnknownStruct(String),

    #[error("unknown value set: {0}")]
    UnknownValueSet(String),

    /// The id's code prefix does not belong to any object type.
    #[error("no object type for id: {0}")]
    UnknownObjectCode(String),

    #[error("code {code} is used by both {first} and {second}")]
    DuplicateCode {
        code: String,
        first: String,
        second: String,
    },

    /// A field references a struct or value set that is not registered.
    #[error("{owner}.{field} references unknown {target}")]
    DanglingReference {
        owner: String,
        field: String,
        target: String,
    },

    #[error("invalid field type: {0}")]
    InvalidFieldType(String),

    #[error("invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
}
