//! Edge storage across the two tiers.
//!
//! The primary store holds the authoritative edge set. The cache holds an
//! ordered list per `(src, edge_name)` under `e_<src>-<edge_name>`. Each
//! mutation of a triple runs under a lock keyed by the triple.

use crate::{EngineError, EngineResult, LockManager};
use graphstore_storage::{CacheStore, PrimaryStore, StorageError};
use graphstore_types::{EdgeTriple, ObjectId};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct EdgeStore {
    primary: Arc<dyn PrimaryStore>,
    cache: Arc<dyn CacheStore>,
    locks: LockManager,
}

fn list_key(src: &ObjectId, edge_name: &str) -> String {
    format!("e_{src}-{edge_name}")
}

fn parse_ids(members: Vec<String>) -> EngineResult<Vec<ObjectId>> {
    members
        .iter()
        .map(|m| {
            ObjectId::parse(m)
                .map_err(|e| EngineError::from(StorageError::InvalidData(e.to_string())))
        })
        .collect()
}

impl EdgeStore {
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        cache: Arc<dyn CacheStore>,
        locks: LockManager,
    ) -> Self {
        Self {
            primary,
            cache,
            locks,
        }
    }

    /// Adds the edge unless it already exists. Returns whether it was added.
    pub async fn create(&self, edge: &EdgeTriple) -> EngineResult<bool> {
        let key = edge.to_string();
        let token = self.locks.acquire(&key).await?;
        let result = self.create_locked(edge).await;
        self.locks.release_quietly(&key, &token).await;
        result
    }

    async fn create_locked(&self, edge: &EdgeTriple) -> EngineResult<bool> {
        let list_key = list_key(&edge.src, &edge.edge_name);
        let dst = edge.dst.as_str();

        if self.cache.list_position(&list_key, dst).await?.is_some() {
            debug!(%edge, "edge already cached");
            return Ok(false);
        }
        let stored = self.primary.get_edges(&edge.src, &edge.edge_name).await?;
        if stored.contains(&edge.dst) {
            debug!(%edge, "edge already stored");
            return Ok(false);
        }

        // A cold list is seeded with the stored edges so none go missing.
        let members: Vec<String> = if self.cache.exists(&list_key).await? {
            vec![dst.to_string()]
        } else {
            stored
                .iter()
                .map(ObjectId::to_string)
                .chain(std::iter::once(dst.to_string()))
                .collect()
        };
        self.cache.list_append(&list_key, &members).await?;
        self.primary.create_edge(edge).await?;
        debug!(%edge, "edge created");
        Ok(true)
    }

    /// Removes the edge if present. Returns whether it was removed.
    pub async fn delete(&self, edge: &EdgeTriple) -> EngineResult<bool> {
        let key = edge.to_string();
        let token = self.locks.acquire(&key).await?;
        let result = self.delete_locked(edge).await;
        self.locks.release_quietly(&key, &token).await;
        result
    }

    async fn delete_locked(&self, edge: &EdgeTriple) -> EngineResult<bool> {
        let list_key = list_key(&edge.src, &edge.edge_name);
        let dst = edge.dst.as_str();

        let cached = self.cache.exists(&list_key).await?;
        if cached && self.cache.list_position(&list_key, dst).await?.is_none() {
            debug!(%edge, "edge not in cached list");
            return Ok(false);
        }
        let stored = self.primary.get_edges(&edge.src, &edge.edge_name).await?;
        if !stored.contains(&edge.dst) {
            debug!(%edge, "edge not stored");
            return Ok(false);
        }

        if cached {
            self.cache.list_remove(&list_key, dst).await?;
        }
        self.primary.delete_edge(edge).await?;
        debug!(%edge, "edge deleted");
        Ok(true)
    }

    /// Destination ids in insertion order, from the cached list when present.
    pub async fn list(&self, src: &ObjectId, edge_name: &str) -> EngineResult<Vec<ObjectId>> {
        let list_key = list_key(src, edge_name);
        if self.cache.exists(&list_key).await? {
            return parse_ids(self.cache.list_range(&list_key).await?);
        }
        Ok(self.primary.get_edges(src, edge_name).await?)
    }

    /// Sources pointing at `dst` through `edge_name`. Primary store only.
    pub async fn reverse(&self, edge_name: &str, dst: &ObjectId) -> EngineResult<Vec<ObjectId>> {
        Ok(self.primary.get_reverse_edges(edge_name, dst).await?)
    }
}
