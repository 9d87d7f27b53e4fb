#![allow(dead_code)]

use async_trait::async_trait;
use graphstore_engine::{EngineConfig, GraphEngine, HookRegistry};
use graphstore_model::{
    CacheLevel, FieldDef, FieldMap, GraphObject, ObjectConfig, SchemaRegistry,
};
use graphstore_storage::{MemoryCache, MemoryStore};
use graphstore_sync::{EventEmitter, EventQueue, SyncPipeline, SyncProcessor, SyncResult};
use graphstore_types::{ChangeEvent, Method};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Records every event handed to the sync side of the emitter.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<ChangeEvent>>,
}

impl EventLog {
    pub fn all(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.all().iter().map(ChangeEvent::route).collect()
    }

    pub fn last(&self) -> ChangeEvent {
        self.all().pop().expect("no events recorded")
    }

    pub fn count(&self, method: Method) -> usize {
        self.all().iter().filter(|e| e.method == method).count()
    }
}

#[async_trait]
impl SyncProcessor for EventLog {
    async fn process_event(&self, event: &ChangeEvent) -> SyncResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn registry() -> SchemaRegistry {
    let human_name = FieldMap::from([
        ("first_name".to_string(), FieldDef::string().required()),
        ("last_name".to_string(), FieldDef::string()),
    ]);
    let grade = FieldMap::from([
        ("student".to_string(), FieldDef::object_id(&["user"]).required()),
        ("score".to_string(), FieldDef::number()),
    ]);

    SchemaRegistry::builder()
        .value_set("user-status", ["created", "active", "blocked"])
        .structure("human-name", human_name)
        .structure("grade", grade)
        .object(
            ObjectConfig::new("user", "Z1")
                .with_cache_level(CacheLevel::External)
                .with_field("email", FieldDef::email().unique())
                .with_field("handle", FieldDef::string().unique())
                .with_field("name", FieldDef::structure("human-name"))
                .with_field(
                    "status",
                    FieldDef::value_set("user-status").with_default(json!("created")),
                )
                .with_field("visits", FieldDef::counter())
                .with_field("created_by", FieldDef::string())
                .with_edge("roles", &["tutor_role"]),
        )
        .object(
            ObjectConfig::new("tutor_role", "T1")
                .with_field("user", FieldDef::object_id(&["user"]).required())
                .with_field("subjects", FieldDef::string().array()),
        )
        .object(
            ObjectConfig::new("session", "S1")
                .with_cache_level(CacheLevel::OnlyCache)
                .with_field("token", FieldDef::string().required())
                .with_field("hits", FieldDef::counter()),
        )
        .object(
            ObjectConfig::new("exam", "E1")
                .with_field("title", FieldDef::string().required())
                .with_field("date", FieldDef::date())
                .with_field("grades", FieldDef::structure("grade").array())
                .with_field("meta", FieldDef::json())
                .with_field("views_any", FieldDef::counter())
                .with_field("_any", FieldDef::number()),
        )
        .build()
        .unwrap()
}

/// Short lock timeouts so contention tests finish quickly on a real clock.
pub fn config() -> EngineConfig {
    EngineConfig {
        lock_ttl_ms: 1_000,
        lock_obtainer_timeout_ms: 200,
        lock_attempt_interval_ms: 10,
        event_queue_capacity: 64,
    }
}

pub struct Harness {
    pub engine: GraphEngine,
    pub primary: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub events: Arc<EventLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_hooks(HookRegistry::new())
    }

    pub fn with_hooks(hooks: HookRegistry) -> Self {
        Self::with_config(config(), hooks)
    }

    pub fn with_config(config: EngineConfig, hooks: HookRegistry) -> Self {
        let primary = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let events = Arc::new(EventLog::default());
        let (queue, worker) = EventQueue::bounded(config.event_queue_capacity);
        worker.spawn();

        let engine = GraphEngine::new(
            config,
            Arc::new(registry()),
            primary.clone(),
            cache.clone(),
            EventEmitter::new(events.clone(), queue),
        )
        .with_hooks(hooks);

        Self {
            engine,
            primary,
            cache,
            events,
        }
    }
}

/// An emitter whose sync side does nothing.
pub fn silent_emitter() -> EventEmitter {
    let (queue, worker) = EventQueue::bounded(16);
    worker.spawn();
    EventEmitter::new(Arc::new(SyncPipeline::new()), queue)
}

pub fn obj(value: Value) -> GraphObject {
    GraphObject::from_value(value).expect("payload must be a JSON object")
}
