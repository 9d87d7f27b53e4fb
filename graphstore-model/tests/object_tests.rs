use graphstore_model::GraphObject;
use serde_json::json;

fn body(value: serde_json::Value) -> GraphObject {
    GraphObject::from_value(value).unwrap()
}

#[test]
fn fixed_field_accessors() {
    let obj = body(json!({ "id": "Z1_a", "object_type": "user", "email": "a@x.com" }));
    assert_eq!(obj.id(), Some("Z1_a"));
    assert_eq!(obj.object_type(), Some("user"));
    assert!(!obj.is_deleted());
}

#[test]
fn null_deleted_at_is_not_deleted() {
    let obj = body(json!({ "deleted_at": null }));
    assert!(!obj.is_deleted());

    let obj = body(json!({ "deleted_at": "2026-01-01T00:00:00.000Z" }));
    assert!(obj.is_deleted());
    assert_eq!(obj.deleted_at(), Some("2026-01-01T00:00:00.000Z"));
}

#[test]
fn merge_drops_null_fields() {
    let mut obj = body(json!({ "email": "a@x.com", "phone": "123" }));
    obj.merge(&body(json!({ "email": null, "phone": "456", "name": "A" })));

    assert!(!obj.contains("email"));
    assert_eq!(obj.get_str("phone"), Some("456"));
    assert_eq!(obj.get_str("name"), Some("A"));
}

#[test]
fn without_strips_fields() {
    let obj = body(json!({ "id": "Z1_a", "views": 4, "likes": 2 }));
    let stripped = obj.without(["views", "likes"]);
    assert_eq!(stripped.len(), 1);
    assert_eq!(obj.len(), 3);
}

#[test]
fn value_of_skips_null() {
    let obj = body(json!({ "a": null, "b": 1 }));
    assert!(obj.value_of("a").is_none());
    assert!(obj.value_of("b").is_some());
    assert!(obj.value_of("c").is_none());
}

#[test]
fn non_object_values_are_rejected() {
    assert!(GraphObject::from_value(json!([1, 2])).is_none());
    assert!(GraphObject::from_value(json!("x")).is_none());
}

#[test]
fn serde_is_transparent() {
    let obj = body(json!({ "id": "Z1_a" }));
    assert_eq!(serde_json::to_string(&obj).unwrap(), r#"{"id":"Z1_a"}"#);
}
