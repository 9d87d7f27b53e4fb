//! Behaviour every primary store must share, run against each backend.

use graphstore_model::GraphObject;
use graphstore_storage::{MemoryStore, PrimaryStore, SqliteStore, StorageError};
use graphstore_types::{CounterModifier, EdgeTriple, ObjectId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn object(id: &ObjectId, object_type: &str, extra: serde_json::Value) -> GraphObject {
    let mut obj = GraphObject::from_value(extra).unwrap();
    obj.insert("id", json!(id.as_str()));
    obj.insert("object_type", json!(object_type));
    obj
}

fn backends() -> Vec<(&'static str, Box<dyn PrimaryStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

// ── Objects ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_returns_body() {
    for (name, store) in backends() {
        let id = ObjectId::generate("Z1");
        let body = object(&id, "user", json!({ "email": "a@b.co" }));
        store.create_object(&id, &body).await.unwrap();

        let loaded = store.get_object(&id).await.unwrap();
        assert_eq!(loaded, Some(body), "{name}");
    }
}

#[tokio::test]
async fn get_missing_object_is_none() {
    for (name, store) in backends() {
        let id = ObjectId::generate("Z1");
        assert_eq!(store.get_object(&id).await.unwrap(), None, "{name}");
    }
}

#[tokio::test]
async fn update_merges_and_null_removes() {
    for (name, store) in backends() {
        let id = ObjectId::generate("Z1");
        let body = object(&id, "user", json!({ "email": "a@b.co", "nick": "al" }));
        store.create_object(&id, &body).await.unwrap();

        let patch = GraphObject::from_value(json!({ "email": "c@d.co", "nick": null })).unwrap();
        let merged = store.update_object(&id, &patch).await.unwrap();

        assert_eq!(merged.get_str("email"), Some("c@d.co"), "{name}");
        assert!(!merged.contains("nick"), "{name}");
        assert_eq!(store.get_object(&id).await.unwrap(), Some(merged), "{name}");
    }
}

#[tokio::test]
async fn update_of_missing_object_upserts() {
    for (name, store) in backends() {
        let id = ObjectId::generate("Z1");
        let patch = GraphObject::from_value(json!({ "deleted_at": "2024-01-01T00:00:00.000Z" }))
            .unwrap();
        store.update_object(&id, &patch).await.unwrap();
        let loaded = store.get_object(&id).await.unwrap().unwrap();
        assert!(loaded.is_deleted(), "{name}");
    }
}

#[tokio::test]
async fn query_objects_pages_by_id() {
    for (name, store) in backends() {
        let mut ids: Vec<ObjectId> = (0..5).map(|_| ObjectId::generate("Z1")).collect();
        ids.sort();
        for id in &ids {
            store.create_object(id, &object(id, "user", json!({}))).await.unwrap();
        }
        let other = ObjectId::generate("T1");
        store
            .create_object(&other, &object(&other, "tutor_role", json!({})))
            .await
            .unwrap();

        let first = store.query_objects("user", None, 3).await.unwrap();
        assert_eq!(first.objects.len(), 3, "{name}");
        assert_eq!(first.next.as_ref(), Some(&ids[2]), "{name}");

        let second = store.query_objects("user", first.next.as_ref(), 3).await.unwrap();
        assert_eq!(second.objects.len(), 2, "{name}");
        assert_eq!(second.next, None, "{name}");
        assert_eq!(second.objects[1].id(), Some(ids[4].as_str()), "{name}");
    }
}

// ── Counters ─────────────────────────────────────────────────────

#[tokio::test]
async fn counters_default_to_zero_and_apply_modifiers() {
    for (name, store) in backends() {
        let id = ObjectId::generate("Z1");
        assert_eq!(store.get_counter(&id, "visits").await.unwrap(), 0, "{name}");

        store.set_counter(&id, "visits", CounterModifier::Set(10)).await.unwrap();
        store.set_counter(&id, "visits", CounterModifier::Increment(5)).await.unwrap();
        let value = store
            .set_counter(&id, "visits", CounterModifier::Decrement(3))
            .await
            .unwrap();

        assert_eq!(value, 12, "{name}");
        assert_eq!(store.get_counter(&id, "visits").await.unwrap(), 12, "{name}");
        assert_eq!(store.get_counter(&id, "other").await.unwrap(), 0, "{name}");
    }
}

// ── Unique index ─────────────────────────────────────────────────

#[tokio::test]
async fn add_unique_is_conditional() {
    for (name, store) in backends() {
        assert!(store.check_unique("user", "email", "a@b.co").await.unwrap(), "{name}");
        assert!(store.add_unique("user", "email", "a@b.co").await.unwrap(), "{name}");
        assert!(!store.check_unique("user", "email", "a@b.co").await.unwrap(), "{name}");
        assert!(!store.add_unique("user", "email", "a@b.co").await.unwrap(), "{name}");

        // Scoped by type and field.
        assert!(store.check_unique("tutor", "email", "a@b.co").await.unwrap(), "{name}");

        store.remove_unique("user", "email", "a@b.co").await.unwrap();
        assert!(store.check_unique("user", "email", "a@b.co").await.unwrap(), "{name}");
    }
}

// ── Edges ────────────────────────────────────────────────────────

#[tokio::test]
async fn edges_keep_insertion_order_and_reverse_index() {
    for (name, store) in backends() {
        let src = ObjectId::generate("Z1");
        let a = ObjectId::generate("T1");
        let b = ObjectId::generate("T1");

        store.create_edge(&EdgeTriple::new(src.clone(), "roles", b.clone())).await.unwrap();
        store.create_edge(&EdgeTriple::new(src.clone(), "roles", a.clone())).await.unwrap();
        store.create_edge(&EdgeTriple::new(src.clone(), "roles", a.clone())).await.unwrap();

        assert_eq!(
            store.get_edges(&src, "roles").await.unwrap(),
            vec![b.clone(), a.clone()],
            "{name}"
        );
        assert_eq!(
            store.get_reverse_edges("roles", &a).await.unwrap(),
            vec![src.clone()],
            "{name}"
        );

        store.delete_edge(&EdgeTriple::new(src.clone(), "roles", b.clone())).await.unwrap();
        assert_eq!(store.get_edges(&src, "roles").await.unwrap(), vec![a], "{name}");
        assert!(store.get_reverse_edges("roles", &b).await.unwrap().is_empty(), "{name}");
    }
}

// ── Memory store instrumentation ─────────────────────────────────

#[tokio::test]
async fn memory_store_counts_writes_only() {
    let store = MemoryStore::new();
    let id = ObjectId::generate("Z1");
    store.create_object(&id, &object(&id, "user", json!({}))).await.unwrap();
    store.get_object(&id).await.unwrap();
    store.get_counter(&id, "visits").await.unwrap();
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn memory_store_failing_mode_rejects_writes() {
    let store = MemoryStore::new();
    store.set_failing(true);
    let id = ObjectId::generate("Z1");
    let err = store
        .create_object(&id, &object(&id, "user", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert_eq!(store.write_count(), 0);

    store.set_failing(false);
    store.create_object(&id, &object(&id, "user", json!({}))).await.unwrap();
    assert_eq!(store.write_count(), 1);
}
