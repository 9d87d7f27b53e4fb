//! Core type definitions for graphstore.
//!
//! This crate defines the schema-agnostic types shared by every layer of the
//! persistence engine:
//! - Object identifiers that carry their object-type code
//! - Counter modifiers (`"+N"`, `"-N"`, `"=N"`)
//! - Edge triples
//! - Change events announced after every committed mutation
//!
//! Schema definitions (object configs, field kinds) live in `graphstore-model`.

mod counter;
mod event;
mod ids;
mod timestamp;

pub use counter::CounterModifier;
pub use event::{ChangeEvent, EventId, EventKind, Method};
pub use ids::{EdgeTriple, ObjectId};
pub use timestamp::{now_rfc3339, serialize_date};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid counter modifier: {0}")]
    InvalidCounterModifier(String),
}
