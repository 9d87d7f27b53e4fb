//! Extension hooks.
//!
//! A static table built before the engine starts, keyed by
//! `"<METHOD> <objectType>"`. Pre-logic may rewrite the in-flight payload;
//! post-logic sees the committed object; read-logic may decorate an object
//! before `get` returns it.

use crate::EngineResult;
use async_trait::async_trait;
use graphstore_model::GraphObject;
use graphstore_types::{Method, ObjectId};
use std::collections::HashMap;
use std::sync::Arc;

/// What a hook is being called for.
#[derive(Debug, Clone, Copy)]
pub struct HookInput<'a> {
    pub method: Method,
    pub object_type: &'a str,
    pub id: &'a ObjectId,
    /// The stored object before this mutation; `None` on create.
    pub previous: Option<&'a GraphObject>,
    pub author: Option<&'a str>,
}

/// Runs before a create or update is written. May mutate the payload.
#[async_trait]
pub trait PreLogic: Send + Sync {
    async fn before(&self, input: HookInput<'_>, payload: &mut GraphObject) -> EngineResult<()>;
}

/// Runs after a create or update is written.
#[async_trait]
pub trait PostLogic: Send + Sync {
    async fn after(&self, input: HookInput<'_>, current: &GraphObject) -> EngineResult<()>;
}

/// Runs on an assembled object before `get` returns it.
#[async_trait]
pub trait ReadLogic: Send + Sync {
    async fn after_read(&self, object: &mut GraphObject) -> EngineResult<()>;
}

fn hook_key(method: Method, object_type: &str) -> String {
    format!("{method} {object_type}")
}

/// Registered hooks. At most one hook of each kind per key.
#[derive(Default, Clone)]
pub struct HookRegistry {
    pre: HashMap<String, Arc<dyn PreLogic>>,
    post: HashMap<String, Arc<dyn PostLogic>>,
    read: HashMap<String, Arc<dyn ReadLogic>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pre(mut self, method: Method, object_type: &str, hook: Arc<dyn PreLogic>) -> Self {
        self.pre.insert(hook_key(method, object_type), hook);
        self
    }

    #[must_use]
    pub fn post(mut self, method: Method, object_type: &str, hook: Arc<dyn PostLogic>) -> Self {
        self.post.insert(hook_key(method, object_type), hook);
        self
    }

    /// Registers `GET <objectType>` read-logic.
    #[must_use]
    pub fn read(mut self, object_type: &str, hook: Arc<dyn ReadLogic>) -> Self {
        self.read.insert(hook_key(Method::Get, object_type), hook);
        self
    }

    pub(crate) fn pre_for(&self, method: Method, object_type: &str) -> Option<&Arc<dyn PreLogic>> {
        self.pre.get(&hook_key(method, object_type))
    }

    pub(crate) fn post_for(
        &self,
        method: Method,
        object_type: &str,
    ) -> Option<&Arc<dyn PostLogic>> {
        self.post.get(&hook_key(method, object_type))
    }

    pub(crate) fn read_for(&self, object_type: &str) -> Option<&Arc<dyn ReadLogic>> {
        self.read.get(&hook_key(Method::Get, object_type))
    }
}
