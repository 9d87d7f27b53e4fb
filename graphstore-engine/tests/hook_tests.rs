mod common;

use async_trait::async_trait;
use common::{Harness, obj};
use graphstore_engine::{
    Context, CreateOptions, EngineError, EngineResult, HookInput, HookRegistry, PostLogic,
    PreLogic, ReadLogic, UpdateOptions,
};
use graphstore_model::GraphObject;
use graphstore_types::{Method, ObjectId};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Sets a field on the payload.
struct Stamp(&'static str, &'static str);

#[async_trait]
impl PreLogic for Stamp {
    async fn before(&self, _input: HookInput<'_>, payload: &mut GraphObject) -> EngineResult<()> {
        payload.insert(self.0, json!(self.1));
        Ok(())
    }
}

/// Tries to rewrite the object's identity.
struct Forge;

#[async_trait]
impl PreLogic for Forge {
    async fn before(&self, _input: HookInput<'_>, payload: &mut GraphObject) -> EngineResult<()> {
        payload.insert("id", json!("Z1_forged"));
        payload.insert("object_type", json!("exam"));
        payload.insert("created_at", json!("1970-01-01T00:00:00.000Z"));
        Ok(())
    }
}

struct Reject;

#[async_trait]
impl PreLogic for Reject {
    async fn before(&self, input: HookInput<'_>, _payload: &mut GraphObject) -> EngineResult<()> {
        Err(EngineError::Hook {
            name: format!("{} {}", input.method, input.object_type),
            message: "not allowed".into(),
        })
    }
}

#[derive(Default)]
struct Seen {
    calls: Mutex<Vec<(Method, bool, Option<String>)>>,
}

#[async_trait]
impl PostLogic for Seen {
    async fn after(&self, input: HookInput<'_>, current: &GraphObject) -> EngineResult<()> {
        assert_eq!(current.id(), Some(input.id.as_str()));
        self.calls.lock().unwrap().push((
            input.method,
            input.previous.is_some(),
            current.get_str("title").map(str::to_string),
        ));
        Ok(())
    }
}

struct Derived;

#[async_trait]
impl ReadLogic for Derived {
    async fn after_read(&self, object: &mut GraphObject) -> EngineResult<()> {
        let title = object.get_str("title").unwrap_or_default().to_uppercase();
        object.insert("title_upper", json!(title));
        Ok(())
    }
}

#[tokio::test]
async fn registered_pre_logic_rewrites_payload() {
    let hooks = HookRegistry::new().pre(Method::Post, "exam", Arc::new(Stamp("title", "Renamed")));
    let h = Harness::with_hooks(hooks);

    let created = h
        .engine
        .create(
            &Context::new(),
            "exam",
            obj(json!({ "title": "Finals" })),
            CreateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(created.get_str("title"), Some("Renamed"));
}

#[tokio::test]
async fn per_call_hooks_run_after_registered_ones() {
    let hooks =
        HookRegistry::new().pre(Method::Patch, "exam", Arc::new(Stamp("title", "Registry")));
    let h = Harness::with_hooks(hooks);
    let ctx = Context::new();
    let created = h
        .engine
        .create(&ctx, "exam", obj(json!({ "title": "Finals" })), CreateOptions::default())
        .await
        .unwrap();
    let id = ObjectId::parse(created.id().unwrap()).unwrap();

    let updated = h
        .engine
        .update(
            &ctx,
            &id,
            obj(json!({ "title": "Payload" })),
            UpdateOptions::default().with_hook(Arc::new(Stamp("title", "PerCall"))),
        )
        .await
        .unwrap();
    assert_eq!(updated.get_str("title"), Some("PerCall"));
}

#[tokio::test]
async fn failing_pre_logic_aborts_without_writes() {
    let hooks = HookRegistry::new().pre(Method::Post, "exam", Arc::new(Reject));
    let h = Harness::with_hooks(hooks);

    let err = h
        .engine
        .create(
            &Context::new(),
            "exam",
            obj(json!({ "title": "Finals" })),
            CreateOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Hook { ref name, .. } if name == "POST exam"));
    assert_eq!(h.primary.write_count(), 0);
    assert!(h.events.all().is_empty());
}

#[tokio::test]
async fn post_logic_sees_committed_objects() {
    let seen = Arc::new(Seen::default());
    let hooks = HookRegistry::new()
        .post(Method::Post, "exam", seen.clone())
        .post(Method::Patch, "exam", seen.clone());
    let h = Harness::with_hooks(hooks);
    let ctx = Context::new();

    let created = h
        .engine
        .create(&ctx, "exam", obj(json!({ "title": "Finals" })), CreateOptions::default())
        .await
        .unwrap();
    let id = ObjectId::parse(created.id().unwrap()).unwrap();
    h.engine
        .update(&ctx, &id, obj(json!({ "title": "Midterms" })), UpdateOptions::default())
        .await
        .unwrap();

    let calls = seen.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            (Method::Post, false, Some("Finals".to_string())),
            (Method::Patch, true, Some("Midterms".to_string())),
        ]
    );
}

#[tokio::test]
async fn read_logic_decorates_get() {
    let hooks = HookRegistry::new().read("exam", Arc::new(Derived));
    let h = Harness::with_hooks(hooks);
    let ctx = Context::new();
    let created = h
        .engine
        .create(&ctx, "exam", obj(json!({ "title": "Finals" })), CreateOptions::default())
        .await
        .unwrap();
    let id = ObjectId::parse(created.id().unwrap()).unwrap();

    assert!(!created.contains("title_upper"));
    let read = h.engine.get(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(read.get_str("title_upper"), Some("FINALS"));
}

#[tokio::test]
async fn hooks_cannot_rewrite_identity() {
    let h = Harness::new();
    let ctx = Context::new();

    let created = h
        .engine
        .create(
            &ctx,
            "user",
            obj(json!({ "email": "a@x.com" })),
            CreateOptions::default().with_hook(Arc::new(Forge)),
        )
        .await
        .unwrap();
    let id = ObjectId::parse(created.id().unwrap()).unwrap();
    assert_ne!(id.as_str(), "Z1_forged");
    assert_eq!(created.object_type(), Some("user"));
    assert_eq!(
        h.events.last().object_id(),
        Some(id.clone()),
        "event must carry the generated id"
    );
    let created_at = created.get_str("created_at").unwrap().to_string();

    let updated = h
        .engine
        .update(
            &ctx,
            &id,
            obj(json!({ "handle": "al" })),
            UpdateOptions::default().with_hook(Arc::new(Forge)),
        )
        .await
        .unwrap();
    assert_eq!(updated.id(), Some(id.as_str()));
    assert_eq!(updated.object_type(), Some("user"));
    assert_eq!(updated.get_str("created_at"), Some(created_at.as_str()));

    let stored = h.engine.get(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(stored.id(), Some(id.as_str()));
    assert_eq!(stored.object_type(), Some("user"));
}
