//! Counter reconciliation.
//!
//! The primary store is the source of truth. The cache keeps a mirror under
//! `<id>-<field>` that only writes populate.

use crate::{EngineError, EngineResult};
use graphstore_model::{GraphObject, ObjectConfig, WILDCARD_FIELD};
use graphstore_storage::{CacheStore, PrimaryStore};
use graphstore_types::{CounterModifier, ObjectId};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CounterReconciler {
    primary: Arc<dyn PrimaryStore>,
    cache: Arc<dyn CacheStore>,
}

impl CounterReconciler {
    pub fn new(primary: Arc<dyn PrimaryStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { primary, cache }
    }

    fn cache_key(id: &ObjectId, field: &str) -> String {
        format!("{id}-{field}")
    }

    /// Reads a counter from the mirror, falling back to the primary store.
    pub async fn get_counter(&self, id: &ObjectId, field: &str) -> EngineResult<i64> {
        let key = Self::cache_key(id, field);
        if let Some(value) = self.cache.get(&key).await?.as_ref().and_then(Value::as_i64) {
            return Ok(value);
        }
        Ok(self.primary.get_counter(id, field).await?)
    }

    /// Writes through the primary store, then mirrors the result.
    pub async fn set_counter(
        &self,
        id: &ObjectId,
        field: &str,
        modifier: CounterModifier,
    ) -> EngineResult<i64> {
        let value = self.primary.set_counter(id, field, modifier).await?;
        self.cache
            .set(&Self::cache_key(id, field), Value::from(value), None)
            .await?;
        debug!(%id, field, %modifier, value, "counter reconciled");
        Ok(value)
    }

    /// Current values of every declared counter, skipping wildcard names.
    pub async fn get_counters(
        &self,
        id: &ObjectId,
        config: &ObjectConfig,
    ) -> EngineResult<GraphObject> {
        let mut counters = GraphObject::new();
        for field in config.counter_fields() {
            if field.contains(WILDCARD_FIELD) {
                continue;
            }
            let value = self.get_counter(id, field).await?;
            counters.insert(field, Value::from(value));
        }
        Ok(counters)
    }

    /// Routes every counter field present in `payload` through
    /// [`set_counter`](Self::set_counter).
    pub async fn apply_counters(
        &self,
        id: &ObjectId,
        config: &ObjectConfig,
        payload: &GraphObject,
    ) -> EngineResult<()> {
        for field in config.counter_fields() {
            let Some(value) = payload.value_of(field) else {
                continue;
            };
            let modifier = CounterModifier::from_value(value)
                .ok_or_else(|| EngineError::bad_data_type(field, "counter"))?;
            self.set_counter(id, field, modifier).await?;
        }
        Ok(())
    }
}
