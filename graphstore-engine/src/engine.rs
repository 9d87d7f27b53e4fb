//! The persistence facade.
//!
//! Turns one logical mutation into the coordinated sequence of lock, cache,
//! primary-store, unique-index and counter operations, then announces it.
//! Locks taken by a call are released on every path before the call returns,
//! and the change event is emitted only after the lock is gone.

use crate::counters::CounterReconciler;
use crate::edges::EdgeStore;
use crate::hooks::{HookInput, HookRegistry, PreLogic};
use crate::policy::TierPolicy;
use crate::unique::{UniqueConstraints, UniqueMode, index_value};
use crate::validate::FieldValidator;
use crate::{Context, EngineConfig, EngineError, EngineResult, LockManager};
use graphstore_model::{GraphObject, ObjectConfig, SchemaRegistry, WILDCARD_FIELD};
use graphstore_storage::{CacheStore, ObjectPage, PrimaryStore};
use graphstore_sync::EventEmitter;
use graphstore_types::{ChangeEvent, CounterModifier, EdgeTriple, Method, ObjectId, now_rfc3339};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, info};

/// Fields a caller can never set through create or update.
const PROTECTED_FIELDS: &[&str] = &["id", "object_type", "created_at", "deleted_at"];

/// Options for [`GraphEngine::create`].
#[derive(Clone, Default)]
pub struct CreateOptions {
    pub author: Option<String>,
    /// Per-call pre-logic, run after the registered handler.
    pub hooks: Vec<Arc<dyn PreLogic>>,
}

impl CreateOptions {
    pub fn by(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PreLogic>) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// Options for [`GraphEngine::update`].
#[derive(Clone, Default)]
pub struct UpdateOptions {
    pub author: Option<String>,
    /// Per-call pre-logic, run after the registered handler.
    pub hooks: Vec<Arc<dyn PreLogic>>,
}

impl UpdateOptions {
    pub fn by(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PreLogic>) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// Options for [`GraphEngine::delete`].
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub author: Option<String>,
    /// Snapshot to use instead of loading the object again.
    pub previous: Option<GraphObject>,
}

/// Result of [`GraphEngine::get_edges`].
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeList {
    Ids(Vec<ObjectId>),
    Objects(Vec<GraphObject>),
}

impl EdgeList {
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::Objects(objects) => objects.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Deletion {
    Deleted {
        previous: GraphObject,
        current: GraphObject,
    },
    AlreadyDeleted(GraphObject),
}

/// Graph persistence and consistency engine.
pub struct GraphEngine {
    config: EngineConfig,
    registry: Arc<SchemaRegistry>,
    primary: Arc<dyn PrimaryStore>,
    cache: Arc<dyn CacheStore>,
    locks: LockManager,
    counters: CounterReconciler,
    edges: EdgeStore,
    unique: UniqueConstraints,
    validator: FieldValidator,
    hooks: HookRegistry,
    emitter: EventEmitter,
}

impl GraphEngine {
    /// Creates an engine with no hooks registered.
    pub fn new(
        config: EngineConfig,
        registry: Arc<SchemaRegistry>,
        primary: Arc<dyn PrimaryStore>,
        cache: Arc<dyn CacheStore>,
        emitter: EventEmitter,
    ) -> Self {
        let locks = LockManager::new(Arc::clone(&cache), &config);
        Self {
            counters: CounterReconciler::new(Arc::clone(&primary), Arc::clone(&cache)),
            edges: EdgeStore::new(Arc::clone(&primary), Arc::clone(&cache), locks.clone()),
            unique: UniqueConstraints::new(Arc::clone(&primary)),
            validator: FieldValidator::new(Arc::clone(&registry)),
            hooks: HookRegistry::default(),
            config,
            registry,
            primary,
            cache,
            locks,
            emitter,
        }
    }

    /// Replaces the hook table.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Prepares the primary store.
    pub async fn init(&self) -> EngineResult<()> {
        self.primary.init().await?;
        info!(object_types = self.registry.object_types().count(), "graph engine ready");
        Ok(())
    }

    /// Closes the event queue and both stores. Events already queued are
    /// still delivered by the worker.
    pub async fn quit(&self) -> EngineResult<()> {
        self.emitter.close();
        self.primary.quit().await?;
        self.cache.quit().await?;
        info!("graph engine stopped");
        Ok(())
    }

    // ── Objects ──────────────────────────────────────────────────

    /// Creates an object of `object_type` from `payload`.
    pub async fn create(
        &self,
        ctx: &Context,
        object_type: &str,
        payload: GraphObject,
        options: CreateOptions,
    ) -> EngineResult<GraphObject> {
        async {
            let config = self.registry.object_config(object_type)?;
            let mut object = fill_defaults(config, payload, options.author.as_deref());
            self.validator.validate(object_type, object.as_map(), false)?;

            let id = ObjectId::generate(&config.code);
            object.insert("id", Value::String(id.to_string()));

            let input = HookInput {
                method: Method::Post,
                object_type,
                id: &id,
                previous: None,
                author: options.author.as_deref(),
            };
            self.run_pre_hooks(input, &options.hooks, &mut object).await?;
            // Identity is pinned whatever the hooks did.
            object.insert("id", Value::String(id.to_string()));
            object.insert("object_type", Value::String(config.object_type.clone()));
            self.unique
                .validate_and_reserve(config, None, &object, UniqueMode::Create)
                .await?;

            let counter_fields = config.counter_fields();
            let body = object.without(counter_fields.iter().copied());
            let policy = TierPolicy::for_level(config.cache_level);
            if policy.write_cache {
                self.cache.set(id.as_str(), body.to_value(), None).await?;
            }
            if policy.write_primary {
                self.primary.create_object(&id, &body).await?;
            }
            self.counters.apply_counters(&id, config, &object).await?;

            let mut current = body;
            current.merge(&self.counters.get_counters(&id, config).await?);
            self.run_post_hook(input, &current).await?;
            debug!(%id, object_type, "object created");

            self.emitter
                .emit(ChangeEvent::object_created(
                    object_type,
                    current.to_value(),
                    options.author.clone(),
                ))
                .await;
            Ok(current)
        }
        .instrument(ctx.span("create"))
        .await
    }

    /// Reads an object with its counters attached. `None` if it never existed.
    pub async fn get(&self, ctx: &Context, id: &ObjectId) -> EngineResult<Option<GraphObject>> {
        async {
            let config = self.registry.object_config_for_id(id)?;
            let Some(mut object) = self.read_object(id, config).await? else {
                return Ok(None);
            };
            if let Some(hook) = self.hooks.read_for(&config.object_type) {
                hook.after_read(&mut object).await?;
            }
            Ok(Some(object))
        }
        .instrument(ctx.span("get"))
        .await
    }

    /// Applies `payload` to an existing object. Fields set to `null` are
    /// removed.
    pub async fn update(
        &self,
        ctx: &Context,
        id: &ObjectId,
        payload: GraphObject,
        options: UpdateOptions,
    ) -> EngineResult<GraphObject> {
        async {
            let config = self.registry.object_config_for_id(id)?;
            self.validator
                .validate(&config.object_type, payload.as_map(), true)?;

            let token = self.locks.acquire(id.as_str()).await?;
            let result = self.update_locked(config, id, payload, &options).await;
            self.locks.release_quietly(id.as_str(), &token).await;
            let (previous, current) = result?;

            self.emitter
                .emit(ChangeEvent::object_updated(
                    &config.object_type,
                    previous.into_value(),
                    current.to_value(),
                    options.author.clone(),
                ))
                .await;
            Ok(current)
        }
        .instrument(ctx.span("update"))
        .await
    }

    async fn update_locked(
        &self,
        config: &ObjectConfig,
        id: &ObjectId,
        mut payload: GraphObject,
        options: &UpdateOptions,
    ) -> EngineResult<(GraphObject, GraphObject)> {
        let previous = self
            .read_object(id, config)
            .await?
            .ok_or_else(|| EngineError::ObjectNotFound { id: id.clone() })?;
        if previous.is_deleted() {
            return Err(EngineError::CannotModifyDeletedObject { id: id.clone() });
        }

        strip_protected(&mut payload);
        payload.insert("updated_at", Value::String(now_rfc3339()));

        let input = HookInput {
            method: Method::Patch,
            object_type: &config.object_type,
            id,
            previous: Some(&previous),
            author: options.author.as_deref(),
        };
        self.run_pre_hooks(input, &options.hooks, &mut payload).await?;
        strip_protected(&mut payload);
        self.unique
            .validate_and_reserve(config, Some(&previous), &payload, UniqueMode::Update)
            .await?;

        let counter_fields = config.counter_fields();
        let patch = payload.without(counter_fields.iter().copied());
        let mut body = previous.without(counter_fields.iter().copied());
        body.merge(&patch);

        let policy = TierPolicy::for_level(config.cache_level);
        if policy.write_cache {
            self.cache.set(id.as_str(), body.to_value(), None).await?;
        }
        if policy.write_primary {
            self.primary.update_object(id, &patch).await?;
        }
        self.counters.apply_counters(id, config, &payload).await?;

        let mut current = body;
        current.merge(&self.counters.get_counters(id, config).await?);
        self.run_post_hook(input, &current).await?;
        debug!(%id, "object updated");
        Ok((previous, current))
    }

    /// Soft-deletes an object by setting `deleted_at`. Deleting an object
    /// that is already deleted returns it unchanged.
    pub async fn delete(
        &self,
        ctx: &Context,
        id: &ObjectId,
        options: DeleteOptions,
    ) -> EngineResult<GraphObject> {
        async {
            let config = self.registry.object_config_for_id(id)?;
            let token = self.locks.acquire(id.as_str()).await?;
            let result = self.delete_locked(config, id, options.previous).await;
            self.locks.release_quietly(id.as_str(), &token).await;

            match result? {
                Deletion::AlreadyDeleted(object) => Ok(object),
                Deletion::Deleted { previous, current } => {
                    self.emitter
                        .emit(ChangeEvent::object_deleted(
                            &config.object_type,
                            previous.into_value(),
                            current.to_value(),
                            options.author,
                        ))
                        .await;
                    Ok(current)
                }
            }
        }
        .instrument(ctx.span("delete"))
        .await
    }

    async fn delete_locked(
        &self,
        config: &ObjectConfig,
        id: &ObjectId,
        snapshot: Option<GraphObject>,
    ) -> EngineResult<Deletion> {
        let previous = match snapshot {
            Some(previous) => previous,
            None => self
                .read_object(id, config)
                .await?
                .ok_or_else(|| EngineError::ObjectNotFound { id: id.clone() })?,
        };
        if previous.is_deleted() {
            debug!(%id, "object already deleted");
            return Ok(Deletion::AlreadyDeleted(previous));
        }

        self.unique
            .validate_and_reserve(config, Some(&previous), &previous, UniqueMode::Delete)
            .await?;

        let mut marker = GraphObject::new();
        marker.insert("deleted_at", Value::String(now_rfc3339()));
        let mut current = previous.clone();
        current.merge(&marker);

        let policy = TierPolicy::for_level(config.cache_level);
        if policy.write_cache {
            let body = current.without(config.counter_fields());
            self.cache.set(id.as_str(), body.to_value(), None).await?;
        }
        // The tombstone always reaches the primary store, whatever the tier.
        self.primary.update_object(id, &marker).await?;
        debug!(%id, "object deleted");
        Ok(Deletion::Deleted { previous, current })
    }

    /// Lists objects of a type from the primary store, with counters attached.
    pub async fn query_objects(
        &self,
        ctx: &Context,
        object_type: &str,
        after: Option<&ObjectId>,
        limit: usize,
    ) -> EngineResult<ObjectPage> {
        async {
            let config = self.registry.object_config(object_type)?;
            let mut page = self.primary.query_objects(object_type, after, limit).await?;
            for object in &mut page.objects {
                let Some(id) = object.id().and_then(|id| ObjectId::parse(id).ok()) else {
                    continue;
                };
                object.merge(&self.counters.get_counters(&id, config).await?);
            }
            Ok(page)
        }
        .instrument(ctx.span("query_objects"))
        .await
    }

    // ── Counters ─────────────────────────────────────────────────

    pub async fn get_counter(
        &self,
        ctx: &Context,
        id: &ObjectId,
        field: &str,
    ) -> EngineResult<i64> {
        self.counters
            .get_counter(id, field)
            .instrument(ctx.span("get_counter"))
            .await
    }

    pub async fn set_counter(
        &self,
        ctx: &Context,
        id: &ObjectId,
        field: &str,
        modifier: CounterModifier,
    ) -> EngineResult<i64> {
        self.counters
            .set_counter(id, field, modifier)
            .instrument(ctx.span("set_counter"))
            .await
    }

    // ── Uniqueness ───────────────────────────────────────────────

    /// Whether `value` is free for a unique field of `object_type`.
    pub async fn check_unique(
        &self,
        ctx: &Context,
        object_type: &str,
        field: &str,
        value: &Value,
    ) -> EngineResult<bool> {
        async {
            Ok(self
                .primary
                .check_unique(object_type, field, &index_value(value))
                .await?)
        }
        .instrument(ctx.span("check_unique"))
        .await
    }

    // ── Edges ────────────────────────────────────────────────────

    /// Links `src` to `dst` through `edge_name`. Creating an existing edge is
    /// a no-op and emits nothing.
    pub async fn create_edge(
        &self,
        ctx: &Context,
        src: &ObjectId,
        edge_name: &str,
        dst: &ObjectId,
        author: Option<String>,
    ) -> EngineResult<()> {
        async {
            let src_type = self.registry.object_type_of(src)?;
            let edge = EdgeTriple::new(src.clone(), edge_name, dst.clone());
            if self.edges.create(&edge).await? {
                self.emitter
                    .emit(ChangeEvent::edge_created(src_type, &edge, author))
                    .await;
            }
            Ok(())
        }
        .instrument(ctx.span("create_edge"))
        .await
    }

    /// Unlinks `src` from `dst`. Deleting a missing edge is a no-op.
    pub async fn delete_edge(
        &self,
        ctx: &Context,
        src: &ObjectId,
        edge_name: &str,
        dst: &ObjectId,
        author: Option<String>,
    ) -> EngineResult<()> {
        async {
            let src_type = self.registry.object_type_of(src)?;
            let edge = EdgeTriple::new(src.clone(), edge_name, dst.clone());
            if self.edges.delete(&edge).await? {
                self.emitter
                    .emit(ChangeEvent::edge_deleted(src_type, &edge, author))
                    .await;
            }
            Ok(())
        }
        .instrument(ctx.span("delete_edge"))
        .await
    }

    /// Destinations of `src` through `edge_name`, in insertion order. With
    /// `lean` only ids are returned; otherwise each id is read as an object
    /// and ids that no longer resolve are skipped.
    pub async fn get_edges(
        &self,
        ctx: &Context,
        src: &ObjectId,
        edge_name: &str,
        lean: bool,
    ) -> EngineResult<EdgeList> {
        let ids = self
            .edges
            .list(src, edge_name)
            .instrument(ctx.span("get_edges"))
            .await?;
        if lean {
            return Ok(EdgeList::Ids(ids));
        }
        let mut objects = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(object) = self.get(ctx, id).await? {
                objects.push(object);
            }
        }
        Ok(EdgeList::Objects(objects))
    }

    /// Sources that point at `dst` through `edge_name`.
    pub async fn get_reverse_edges(
        &self,
        ctx: &Context,
        edge_name: &str,
        dst: &ObjectId,
    ) -> EngineResult<Vec<ObjectId>> {
        self.edges
            .reverse(edge_name, dst)
            .instrument(ctx.span("get_reverse_edges"))
            .await
    }

    // ── Internals ────────────────────────────────────────────────

    /// Reads the body per the tier policy and attaches counters.
    async fn read_object(
        &self,
        id: &ObjectId,
        config: &ObjectConfig,
    ) -> EngineResult<Option<GraphObject>> {
        let policy = TierPolicy::for_level(config.cache_level);
        let mut found = None;
        if policy.read_cache {
            found = self
                .cache
                .get(id.as_str())
                .await?
                .and_then(GraphObject::from_value);
            debug!(%id, hit = found.is_some(), "cache lookup");
        }
        if found.is_none() {
            found = self.primary.get_object(id).await?;
        }
        let Some(mut object) = found else {
            return Ok(None);
        };
        object.merge(&self.counters.get_counters(id, config).await?);
        Ok(Some(object))
    }

    async fn run_pre_hooks(
        &self,
        input: HookInput<'_>,
        per_call: &[Arc<dyn PreLogic>],
        payload: &mut GraphObject,
    ) -> EngineResult<()> {
        if let Some(hook) = self.hooks.pre_for(input.method, input.object_type) {
            hook.before(input, payload).await?;
        }
        for hook in per_call {
            hook.before(input, payload).await?;
        }
        Ok(())
    }

    async fn run_post_hook(&self, input: HookInput<'_>, current: &GraphObject) -> EngineResult<()> {
        if let Some(hook) = self.hooks.post_for(input.method, input.object_type) {
            hook.after(input, current).await?;
        }
        Ok(())
    }
}

fn strip_protected(payload: &mut GraphObject) {
    for field in PROTECTED_FIELDS {
        payload.remove(field);
    }
}

/// Stamps the fixed fields and schema defaults onto a create payload.
fn fill_defaults(
    config: &ObjectConfig,
    mut payload: GraphObject,
    author: Option<&str>,
) -> GraphObject {
    strip_protected(&mut payload);
    let now = now_rfc3339();
    payload.insert("object_type", Value::String(config.object_type.clone()));
    payload.insert("created_at", Value::String(now.clone()));
    payload.insert("updated_at", Value::String(now));

    for (name, def) in &config.fields {
        if name == WILDCARD_FIELD {
            continue;
        }
        if let Some(default) = &def.default {
            if payload.value_of(name).is_none() {
                payload.insert(name.clone(), default.clone());
            }
        }
    }
    if let (Some(author), Some(_)) = (author, config.field("created_by")) {
        payload.insert("created_by", Value::String(author.to_string()));
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_model::FieldDef;
    use serde_json::json;

    #[test]
    fn fill_defaults_stamps_fixed_fields_and_defaults() {
        let config = ObjectConfig::new("exam", "E1")
            .with_field("status", FieldDef::string().with_default(json!("draft")))
            .with_field("title", FieldDef::string().with_default(json!("untitled")))
            .with_field("created_by", FieldDef::string());
        let payload = GraphObject::from_value(json!({
            "id": "E1_forged",
            "title": "Finals",
        }))
        .unwrap();

        let filled = fill_defaults(&config, payload, Some("Z1_author"));

        assert!(!filled.contains("id"));
        assert_eq!(filled.object_type(), Some("exam"));
        assert_eq!(filled.get_str("status"), Some("draft"));
        assert_eq!(filled.get_str("title"), Some("Finals"));
        assert_eq!(filled.get_str("created_by"), Some("Z1_author"));
        assert_eq!(filled.get("created_at"), filled.get("updated_at"));
    }

    #[test]
    fn created_by_needs_a_declared_field() {
        let config = ObjectConfig::new("exam", "E1");
        let filled = fill_defaults(&config, GraphObject::new(), Some("Z1_author"));
        assert!(!filled.contains("created_by"));
    }
}
