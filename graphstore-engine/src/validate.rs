//! Schema-driven field validation.
//!
//! One dispatch over the closed [`FieldKind`]/[`ValueKind`] sum types. Fails
//! fast on the first invalid field. Runs entirely against the in-memory
//! registry, so it does no I/O.

use crate::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate};
use graphstore_model::{
    FIXED_OBJECT_FIELDS, FieldDef, FieldKind, SchemaRegistry, ValueKind, WILDCARD_FIELD,
};
use graphstore_types::{CounterModifier, ObjectId};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct FieldValidator {
    registry: Arc<SchemaRegistry>,
}

/// A value counts as missing when absent, `null`, or an empty string.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Accepts `local@domain.tld` with no whitespace.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

impl FieldValidator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Validates `data` against the fields of an object type or struct.
    ///
    /// With `partial`, only fields present in `data` are checked (updates).
    /// Otherwise every declared field is checked as well, so required fields
    /// missing from the payload are caught (creation).
    pub fn validate(
        &self,
        object_type_or_struct: &str,
        data: &Map<String, Value>,
        partial: bool,
    ) -> EngineResult<()> {
        let fields = self.registry.fields_for(object_type_or_struct)?;
        let wildcard = fields.get(WILDCARD_FIELD);

        let mut names: BTreeSet<&str> = data.keys().map(String::as_str).collect();
        if !partial {
            names.extend(
                fields
                    .keys()
                    .map(String::as_str)
                    .filter(|name| *name != WILDCARD_FIELD),
            );
        }

        for name in names {
            if FIXED_OBJECT_FIELDS.contains(&name) {
                continue;
            }
            let def = fields.get(name).or(wildcard).ok_or_else(|| {
                EngineError::ValidationErrorFieldNotFound {
                    field_name: name.to_string(),
                }
            })?;
            self.validate_field(name, def, data.get(name))?;
        }
        Ok(())
    }

    fn validate_field(
        &self,
        name: &str,
        def: &FieldDef,
        value: Option<&Value>,
    ) -> EngineResult<()> {
        if is_missing(value) {
            if def.required {
                return Err(EngineError::ValidationErrorRequiredField {
                    field_name: name.to_string(),
                    field_type: def.kind.to_string(),
                });
            }
            return Ok(());
        }
        let Some(value) = value else { return Ok(()) };

        match &def.kind {
            FieldKind::Json => Ok(()),
            FieldKind::Counter => {
                if CounterModifier::from_value(value).is_some() {
                    Ok(())
                } else {
                    Err(EngineError::bad_data_type(name, &def.kind))
                }
            }
            FieldKind::Single(kind) => self.validate_value(name, kind, &def.kind, value),
            FieldKind::Array(kind) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| EngineError::bad_data_type(name, &def.kind))?;
                items
                    .iter()
                    .try_for_each(|item| self.validate_value(name, kind, &def.kind, item))
            }
        }
    }

    /// Checks one value; `label` is the field's full kind, used in errors.
    fn validate_value(
        &self,
        name: &str,
        kind: &ValueKind,
        label: &FieldKind,
        value: &Value,
    ) -> EngineResult<()> {
        let ok = match kind {
            ValueKind::String => value.is_string(),
            ValueKind::Email => value.as_str().is_some_and(is_email),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Date => value.as_str().is_some_and(is_date),
            ValueKind::ObjectId(allowed) => value
                .as_str()
                .and_then(|s| ObjectId::parse(s).ok())
                .and_then(|id| {
                    self.registry
                        .object_type_of(&id)
                        .ok()
                        .map(str::to_string)
                })
                .is_some_and(|object_type| allowed.iter().any(|t| *t == object_type)),
            ValueKind::ValueSet(set) => match value.as_str() {
                Some(code) => self.registry.value_set(set)?.iter().any(|c| c == code),
                None => false,
            },
            ValueKind::Struct(struct_name) => {
                let Some(nested) = value.as_object() else {
                    return Err(EngineError::bad_data_type(name, label));
                };
                return self.validate(struct_name, nested, false);
            }
        };
        if ok {
            Ok(())
        } else {
            Err(EngineError::bad_data_type(name, label))
        }
    }
}
