//! Synchronous sync pipeline.
//!
//! Triggers are registered up front, keyed by route, and looked up for each
//! event. The table is not modified after construction.

use crate::SyncResult;
use async_trait::async_trait;
use graphstore_types::{ChangeEvent, Method};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Receives every change event before the mutation returns.
#[async_trait]
pub trait SyncProcessor: Send + Sync {
    async fn process_event(&self, event: &ChangeEvent) -> SyncResult<()>;
}

/// A handler bound to one `"<METHOD> <path>"` route.
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn run(&self, event: &ChangeEvent) -> SyncResult<()>;
}

/// Route table of sync triggers.
#[derive(Default, Clone)]
pub struct SyncPipeline {
    triggers: HashMap<String, Arc<dyn Trigger>>,
}

impl SyncPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trigger for `method` on `path`, replacing any previous one.
    #[must_use]
    pub fn with_trigger(
        mut self,
        method: Method,
        path: impl AsRef<str>,
        trigger: Arc<dyn Trigger>,
    ) -> Self {
        self.triggers
            .insert(format!("{method} {}", path.as_ref()), trigger);
        self
    }

    pub fn has_trigger(&self, route: &str) -> bool {
        self.triggers.contains_key(route)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[async_trait]
impl SyncProcessor for SyncPipeline {
    async fn process_event(&self, event: &ChangeEvent) -> SyncResult<()> {
        let route = event.route();
        match self.triggers.get(&route) {
            Some(trigger) => {
                debug!(%route, event_id = %event.id, "running sync trigger");
                trigger.run(event).await
            }
            None => Ok(()),
        }
    }
}
