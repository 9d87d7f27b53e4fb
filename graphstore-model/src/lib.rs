//! Schema model for graphstore.
//!
//! Defines the types every engine component reads but never mutates:
//! - [`GraphObject`]: the body of a schema-typed record (id, type, fields, timestamps)
//! - [`ObjectConfig`]: per-object-type schema with fields, edges, cache level and id code
//! - [`FieldKind`] / [`ValueKind`]: the closed set of field kinds the validator dispatches on
//! - [`SchemaRegistry`]: the immutable, process-wide table of configs, structs and value sets
//!
//! The registry is built once at startup (from code or a JSON document) and
//! shared as `Arc<SchemaRegistry>`.

mod error;
mod object;
mod registry;
mod schema;

pub use error::{SchemaError, SchemaResult};
pub use object::{GraphObject, FIXED_OBJECT_FIELDS};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{
    CacheLevel, EdgeDef, FieldDef, FieldKind, FieldMap, ObjectConfig, StructConfig, ValueKind,
    WILDCARD_FIELD,
};
