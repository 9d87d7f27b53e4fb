mod common;

use common::{obj, registry};
use graphstore_engine::{EngineError, FieldValidator};
use graphstore_model::{FieldDef, ObjectConfig, SchemaRegistry};
use graphstore_types::ObjectId;
use serde_json::json;
use std::sync::Arc;

fn validator() -> FieldValidator {
    FieldValidator::new(Arc::new(registry()))
}

fn bad_type(err: EngineError) -> (String, String) {
    match err {
        EngineError::ValidationErrorBadDataType {
            field_name,
            field_type,
        } => (field_name, field_type),
        other => panic!("expected bad data type, got {other:?}"),
    }
}

#[test]
fn fixed_fields_are_never_checked() {
    let data = obj(json!({
        "id": 42,
        "object_type": "user",
        "created_at": "whenever",
        "deleted_at": null,
        "created_by": "Z1_x",
    }));
    validator().validate("user", data.as_map(), true).unwrap();
}

#[test]
fn unknown_field_is_rejected() {
    let err = validator()
        .validate("user", obj(json!({ "nickname": "al" })).as_map(), true)
        .unwrap_err();
    assert_eq!(err.code(), "ValidationErrorFieldNotFound");
}

#[test]
fn wildcard_covers_undeclared_fields() {
    let v = validator();
    let data = obj(json!({ "title": "Finals", "room": 12 }));
    v.validate("exam", data.as_map(), false).unwrap();

    let err = v
        .validate("exam", obj(json!({ "room": "twelve" })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("room".to_string(), "number".to_string()));
}

#[test]
fn required_fields_only_enforced_on_full_validation() {
    let v = validator();
    v.validate("exam", obj(json!({ "date": "2024-06-01" })).as_map(), true)
        .unwrap();

    let err = v
        .validate("exam", obj(json!({ "date": "2024-06-01" })).as_map(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ValidationErrorRequiredField { ref field_name, ref field_type }
            if field_name == "title" && field_type == "string"
    ));
}

#[test]
fn empty_string_counts_as_missing() {
    let err = validator()
        .validate("exam", obj(json!({ "title": "" })).as_map(), false)
        .unwrap_err();
    assert_eq!(err.code(), "ValidationErrorRequiredField");
}

#[test]
fn dates_must_parse() {
    let v = validator();
    v.validate("exam", obj(json!({ "date": "2024-06-01T09:00:00Z" })).as_map(), true)
        .unwrap();
    let err = v
        .validate("exam", obj(json!({ "date": "June 1st" })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("date".to_string(), "date".to_string()));
}

#[test]
fn value_sets_are_closed() {
    let v = validator();
    v.validate("user", obj(json!({ "status": "active" })).as_map(), true)
        .unwrap();
    let err = v
        .validate("user", obj(json!({ "status": "deleted" })).as_map(), true)
        .unwrap_err();
    assert_eq!(
        bad_type(err),
        ("status".to_string(), "value-set<user-status>".to_string())
    );
}

#[test]
fn arrays_check_every_element() {
    let v = validator();
    let user = ObjectId::generate("Z1");
    v.validate(
        "tutor_role",
        obj(json!({ "user": user.as_str(), "subjects": ["math", "art"] })).as_map(),
        false,
    )
    .unwrap();

    let err = v
        .validate("tutor_role", obj(json!({ "subjects": ["math", 7] })).as_map(), true)
        .unwrap_err();
    assert_eq!(
        bad_type(err),
        ("subjects".to_string(), "array:string".to_string())
    );

    let err = v
        .validate("tutor_role", obj(json!({ "subjects": "math" })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err).1, "array:string");
}

#[test]
fn object_ids_must_reference_allowed_types() {
    let v = validator();
    let role = ObjectId::generate("T1");
    let err = v
        .validate("tutor_role", obj(json!({ "user": role.as_str() })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("user".to_string(), "object-id".to_string()));

    let err = v
        .validate("tutor_role", obj(json!({ "user": "QQ_123" })).as_map(), true)
        .unwrap_err();
    assert_eq!(err.code(), "ValidationErrorBadDataType");

    let err = v
        .validate("tutor_role", obj(json!({ "user": "no-code" })).as_map(), true)
        .unwrap_err();
    assert_eq!(err.code(), "ValidationErrorBadDataType");
}

#[test]
fn object_id_without_target_types_accepts_nothing() {
    let registry = SchemaRegistry::builder()
        .object(ObjectConfig::new("user", "Z1"))
        .object(ObjectConfig::new("note", "N1").with_field("ref", FieldDef::object_id(&[])))
        .build()
        .unwrap();
    let v = FieldValidator::new(Arc::new(registry));
    let user = ObjectId::generate("Z1");

    let err = v
        .validate("note", obj(json!({ "ref": user.as_str() })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("ref".to_string(), "object-id".to_string()));
}

#[test]
fn nested_structs_are_validated_recursively() {
    let v = validator();
    let student = ObjectId::generate("Z1");
    v.validate(
        "exam",
        obj(json!({
            "title": "Finals",
            "grades": [{ "student": student.as_str(), "score": 9.5 }],
        }))
        .as_map(),
        false,
    )
    .unwrap();

    // The error names the field inside the struct.
    let err = v
        .validate("exam", obj(json!({ "grades": [{ "score": 9.5 }] })).as_map(), true)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ValidationErrorRequiredField { ref field_name, .. } if field_name == "student"
    ));

    let err = v
        .validate("exam", obj(json!({ "grades": ["A+"] })).as_map(), true)
        .unwrap_err();
    assert_eq!(
        bad_type(err),
        ("grades".to_string(), "array:struct<grade>".to_string())
    );
}

#[test]
fn emails_are_checked() {
    let v = validator();
    v.validate("user", obj(json!({ "email": "a@x.com" })).as_map(), true)
        .unwrap();
    let err = v
        .validate("user", obj(json!({ "email": "a@x" })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("email".to_string(), "string<email>".to_string()));
}

#[test]
fn counters_accept_numbers_and_modifiers() {
    let v = validator();
    for ok in [json!(3), json!("+2"), json!("-1"), json!("=9")] {
        v.validate("user", obj(json!({ "visits": ok })).as_map(), true)
            .unwrap();
    }
    let err = v
        .validate("user", obj(json!({ "visits": "lots" })).as_map(), true)
        .unwrap_err();
    assert_eq!(bad_type(err), ("visits".to_string(), "counter".to_string()));
}

#[test]
fn json_fields_accept_anything() {
    validator()
        .validate(
            "exam",
            obj(json!({ "meta": { "nested": [1, "two", null] } })).as_map(),
            true,
        )
        .unwrap();
}
