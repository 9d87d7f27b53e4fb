mod common;

use async_trait::async_trait;
use common::{config, obj, registry};
use graphstore_engine::{Context, CreateOptions, GraphEngine, HookRegistry};
use graphstore_storage::{MemoryCache, MemoryStore};
use graphstore_sync::{
    EventEmitter, EventQueue, Subscriber, SyncError, SyncPipeline, SyncResult, Trigger,
};
use graphstore_types::{ChangeEvent, Method};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Collect {
    routes: Mutex<Vec<String>>,
}

#[async_trait]
impl Subscriber for Collect {
    fn name(&self) -> &str {
        "collect"
    }

    async fn on_event(&self, event: &ChangeEvent) -> SyncResult<()> {
        self.routes.lock().unwrap().push(event.route());
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl Trigger for Broken {
    async fn run(&self, _event: &ChangeEvent) -> SyncResult<()> {
        Err(SyncError::Trigger("index offline".into()))
    }
}

#[tokio::test]
async fn events_reach_queue_subscribers_in_order() {
    let collect = Arc::new(Collect::default());
    let (queue, worker) = EventQueue::bounded(4);
    let drained = worker.subscribe(collect.clone()).spawn();

    let engine = GraphEngine::new(
        config(),
        Arc::new(registry()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        EventEmitter::new(Arc::new(SyncPipeline::new()), queue),
    );
    let ctx = Context::new();
    for title in ["one", "two", "three"] {
        engine
            .create(&ctx, "exam", obj(json!({ "title": title })), CreateOptions::default())
            .await
            .unwrap();
    }
    engine.quit().await.unwrap();

    assert_eq!(drained.await.unwrap(), 3);
    assert_eq!(
        collect.routes.lock().unwrap().clone(),
        vec!["POST exam", "POST exam", "POST exam"]
    );
}

#[tokio::test]
async fn emission_failures_do_not_fail_the_mutation() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let pipeline = SyncPipeline::new().with_trigger(Method::Post, "exam", Arc::new(Broken));
    let (queue, worker) = EventQueue::bounded(1);
    drop(worker);

    let engine = GraphEngine::new(
        config(),
        Arc::new(registry()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCache::new()),
        EventEmitter::new(Arc::new(pipeline), queue),
    )
    .with_hooks(HookRegistry::new());

    let created = engine
        .create(
            &Context::new(),
            "exam",
            obj(json!({ "title": "Finals" })),
            CreateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(created.get_str("title"), Some("Finals"));
}
