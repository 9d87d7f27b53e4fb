//! Error types for the engine.

use graphstore_model::SchemaError;
use graphstore_storage::StorageError;
use graphstore_types::ObjectId;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by [`GraphEngine`](crate::GraphEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The lock was not obtained within the configured obtainer timeout.
    #[error("lock not obtained for key: {key}")]
    LockTimeout { key: String },

    #[error("cannot modify deleted object: {id}")]
    CannotModifyDeletedObject { id: ObjectId },

    #[error("field '{field_name}' ({field_type}) is required")]
    ValidationErrorRequiredField {
        field_name: String,
        field_type: String,
    },

    #[error("field '{field_name}' must be of type {field_type}")]
    ValidationErrorBadDataType {
        field_name: String,
        field_type: String,
    },

    #[error("field '{field_name}' is not defined in the schema")]
    ValidationErrorFieldNotFound { field_name: String },

    #[error("value of unique field '{field_name}' is already taken")]
    ValidationErrorUniqueField { field_name: String },

    #[error("object not found: {id}")]
    ObjectNotFound { id: ObjectId },

    /// A pre/post/read extension hook rejected the operation.
    #[error("hook '{name}' failed: {message}")]
    Hook { name: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl EngineError {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Stable error code, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockTimeout { .. } => "LockTimeout",
            Self::CannotModifyDeletedObject { .. } => "CannotModifyDeletedObject",
            Self::ValidationErrorRequiredField { .. } => "ValidationErrorRequiredField",
            Self::ValidationErrorBadDataType { .. } => "ValidationErrorBadDataType",
            Self::ValidationErrorFieldNotFound { .. } => "ValidationErrorFieldNotFound",
            Self::ValidationErrorUniqueField { .. } => "ValidationErrorUniqueField",
            Self::ObjectNotFound { .. } => "ObjectNotFound",
            Self::Hook { .. } => "HookError",
            Self::Config(_) => "ConfigError",
            Self::Storage(_) => "StorageError",
            Self::Schema(_) => "SchemaError",
        }
    }

    pub(crate) fn bad_data_type(field_name: &str, field_type: impl ToString) -> Self {
        Self::ValidationErrorBadDataType {
            field_name: field_name.to_string(),
            field_type: field_type.to_string(),
        }
    }
}
