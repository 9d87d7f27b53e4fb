//! In-process primary store.
//!
//! Holds everything in maps behind a single mutex. Counts successful writes
//! so tests can assert that an operation touched (or did not touch) the
//! primary store, and can be switched into a failing mode to exercise error
//! paths.

use crate::{ObjectPage, PrimaryStore, StorageError, StorageResult};
use async_trait::async_trait;
use graphstore_model::GraphObject;
use graphstore_types::{CounterModifier, EdgeTriple, ObjectId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<ObjectId, GraphObject>,
    counters: HashMap<(ObjectId, String), i64>,
    uniques: HashSet<(String, String, String)>,
    /// `(src, edge_name)` → destinations in insertion order.
    edges: HashMap<(ObjectId, String), Vec<ObjectId>>,
}

/// In-memory [`PrimaryStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    writes: AtomicU64,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// While set, every write fails with [`StorageError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of reservations in the unique index.
    pub fn unique_count(&self) -> usize {
        self.lock().uniques.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Guards a write: fails in failing mode, otherwise counts it.
    fn write<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> StorageResult<T> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store is failing".into()));
        }
        let out = f(&mut self.lock());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }
}

fn unique_key(object_type: &str, field: &str, value: &str) -> (String, String, String) {
    (object_type.to_string(), field.to_string(), value.to_string())
}

#[async_trait]
impl PrimaryStore for MemoryStore {
    async fn create_object(&self, id: &ObjectId, object: &GraphObject) -> StorageResult<()> {
        self.write(|state| {
            state.objects.insert(id.clone(), object.clone());
        })
    }

    async fn get_object(&self, id: &ObjectId) -> StorageResult<Option<GraphObject>> {
        Ok(self.lock().objects.get(id).cloned())
    }

    async fn update_object(
        &self,
        id: &ObjectId,
        patch: &GraphObject,
    ) -> StorageResult<GraphObject> {
        self.write(|state| {
            let object = state.objects.entry(id.clone()).or_default();
            object.merge(patch);
            object.clone()
        })
    }

    async fn query_objects(
        &self,
        object_type: &str,
        after: Option<&ObjectId>,
        limit: usize,
    ) -> StorageResult<ObjectPage> {
        let state = self.lock();
        let mut matching = state
            .objects
            .iter()
            .filter(|(id, _)| after.is_none_or(|after| *id > after))
            .filter(|(_, object)| object.object_type() == Some(object_type));

        let objects: Vec<GraphObject> = matching
            .by_ref()
            .take(limit)
            .map(|(_, object)| object.clone())
            .collect();
        let next = if matching.next().is_some() {
            objects
                .last()
                .and_then(GraphObject::id)
                .and_then(|id| ObjectId::parse(id).ok())
        } else {
            None
        };
        Ok(ObjectPage { objects, next })
    }

    async fn get_counter(&self, id: &ObjectId, field: &str) -> StorageResult<i64> {
        Ok(self
            .lock()
            .counters
            .get(&(id.clone(), field.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn set_counter(
        &self,
        id: &ObjectId,
        field: &str,
        modifier: CounterModifier,
    ) -> StorageResult<i64> {
        self.write(|state| {
            let value = state
                .counters
                .entry((id.clone(), field.to_string()))
                .or_insert(0);
            *value = modifier.apply(*value);
            *value
        })
    }

    async fn check_unique(
        &self,
        object_type: &str,
        field: &str,
        value: &str,
    ) -> StorageResult<bool> {
        Ok(!self
            .lock()
            .uniques
            .contains(&unique_key(object_type, field, value)))
    }

    async fn add_unique(&self, object_type: &str, field: &str, value: &str) -> StorageResult<bool> {
        self.write(|state| state.uniques.insert(unique_key(object_type, field, value)))
    }

    async fn remove_unique(
        &self,
        object_type: &str,
        field: &str,
        value: &str,
    ) -> StorageResult<()> {
        self.write(|state| {
            state.uniques.remove(&unique_key(object_type, field, value));
        })
    }

    async fn create_edge(&self, edge: &EdgeTriple) -> StorageResult<()> {
        self.write(|state| {
            let dsts = state
                .edges
                .entry((edge.src.clone(), edge.edge_name.clone()))
                .or_default();
            if !dsts.contains(&edge.dst) {
                dsts.push(edge.dst.clone());
            }
        })
    }

    async fn delete_edge(&self, edge: &EdgeTriple) -> StorageResult<()> {
        self.write(|state| {
            let key = (edge.src.clone(), edge.edge_name.clone());
            if let Some(dsts) = state.edges.get_mut(&key) {
                dsts.retain(|d| d != &edge.dst);
                if dsts.is_empty() {
                    state.edges.remove(&key);
                }
            }
        })
    }

    async fn get_edges(&self, src: &ObjectId, edge_name: &str) -> StorageResult<Vec<ObjectId>> {
        Ok(self
            .lock()
            .edges
            .get(&(src.clone(), edge_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_reverse_edges(
        &self,
        edge_name: &str,
        dst: &ObjectId,
    ) -> StorageResult<Vec<ObjectId>> {
        let state = self.lock();
        let mut srcs: Vec<ObjectId> = state
            .edges
            .iter()
            .filter(|((_, name), dsts)| name == edge_name && dsts.contains(dst))
            .map(|((src, _), _)| src.clone())
            .collect();
        srcs.sort();
        Ok(srcs)
    }
}
