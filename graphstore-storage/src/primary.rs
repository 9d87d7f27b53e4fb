//! Primary store abstraction.
//!
//! Logical layout: objects keyed by id; counters keyed by `(id, field)`;
//! a unique index keyed by `(object_type, field, value)`; an edge set keyed
//! by `(src, edge_name)` plus its reverse index by `(edge_name, dst)`.

use crate::StorageResult;
use async_trait::async_trait;
use graphstore_model::GraphObject;
use graphstore_types::{CounterModifier, EdgeTriple, ObjectId};

/// A page of objects returned by [`PrimaryStore::query_objects`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPage {
    pub objects: Vec<GraphObject>,
    /// Pass as `after` to fetch the next page. `None` on the last page.
    pub next: Option<ObjectId>,
}

/// The durable, authoritative store.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Prepares tables/indexes. Idempotent.
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    // ── Objects ──────────────────────────────────────────────────

    async fn create_object(&self, id: &ObjectId, object: &GraphObject) -> StorageResult<()>;

    async fn get_object(&self, id: &ObjectId) -> StorageResult<Option<GraphObject>>;

    /// Merges `patch` into the stored body (fields set to `null` are removed)
    /// and returns the result. A missing object is created from the patch.
    async fn update_object(&self, id: &ObjectId, patch: &GraphObject)
        -> StorageResult<GraphObject>;

    /// Lists objects of a type ordered by id, starting after `after`.
    async fn query_objects(
        &self,
        object_type: &str,
        after: Option<&ObjectId>,
        limit: usize,
    ) -> StorageResult<ObjectPage>;

    // ── Counters ─────────────────────────────────────────────────

    /// Current value of a counter; 0 if never written.
    async fn get_counter(&self, id: &ObjectId, field: &str) -> StorageResult<i64>;

    /// Applies a modifier and returns the resulting value.
    async fn set_counter(
        &self,
        id: &ObjectId,
        field: &str,
        modifier: CounterModifier,
    ) -> StorageResult<i64>;

    // ── Unique index ─────────────────────────────────────────────

    /// Returns true if the value is free and can be reserved.
    async fn check_unique(&self, object_type: &str, field: &str, value: &str)
        -> StorageResult<bool>;

    /// Reserves a value. Returns false, leaving the index untouched, when the
    /// value is already reserved.
    async fn add_unique(&self, object_type: &str, field: &str, value: &str)
        -> StorageResult<bool>;

    async fn remove_unique(&self, object_type: &str, field: &str, value: &str)
        -> StorageResult<()>;

    // ── Edges ────────────────────────────────────────────────────

    async fn create_edge(&self, edge: &EdgeTriple) -> StorageResult<()>;

    async fn delete_edge(&self, edge: &EdgeTriple) -> StorageResult<()>;

    async fn get_edges(&self, src: &ObjectId, edge_name: &str) -> StorageResult<Vec<ObjectId>>;

    async fn get_reverse_edges(&self, edge_name: &str, dst: &ObjectId)
        -> StorageResult<Vec<ObjectId>>;

    /// Flushes and closes the store.
    async fn quit(&self) -> StorageResult<()> {
        Ok(())
    }
}
