//! The schema registry.
//!
//! An immutable table of object configs, struct schemas and value sets,
//! built once at startup and shared read-only with the engine.

use crate::{FieldKind, FieldMap, ObjectConfig, SchemaError, SchemaResult, StructConfig, ValueKind};
use graphstore_types::ObjectId;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Read-only schema lookups used by the engine.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    objects: HashMap<String, ObjectConfig>,
    structs: HashMap<String, StructConfig>,
    value_sets: HashMap<String, Vec<String>>,
    /// id code → object type.
    codes: HashMap<String, String>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Loads a registry from a JSON document of the form
    /// `{"objects": {...}, "structs": {...}, "valueSets": {...}}`.
    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        let mut builder = Self::builder();
        for (object_type, mut config) in doc.objects {
            config.object_type = object_type;
            builder = builder.object(config);
        }
        for (name, config) in doc.structs {
            builder = builder.structure(name, config.fields);
        }
        for (name, codes) in doc.value_sets {
            builder = builder.value_set(name, codes);
        }
        builder.build()
    }

    pub fn object_config(&self, object_type: &str) -> SchemaResult<&ObjectConfig> {
        self.objects
            .get(object_type)
            .ok_or_else(|| SchemaError::UnknownObjectType(object_type.to_string()))
    }

    /// Resolves the object type of an id from its code prefix.
    pub fn object_type_of(&self, id: &ObjectId) -> SchemaResult<&str> {
        self.codes
            .get(id.code())
            .map(String::as_str)
            .ok_or_else(|| SchemaError::UnknownObjectCode(id.to_string()))
    }

    /// Config of the object type an id belongs to.
    pub fn object_config_for_id(&self, id: &ObjectId) -> SchemaResult<&ObjectConfig> {
        let object_type = self.object_type_of(id)?;
        self.object_config(object_type)
    }

    /// Field definitions of an object type or, failing that, a named struct.
    pub fn fields_for(&self, object_type_or_struct: &str) -> SchemaResult<&FieldMap> {
        if let Some(config) = self.objects.get(object_type_or_struct) {
            return Ok(&config.fields);
        }
        self.structs
            .get(object_type_or_struct)
            .map(|s| &s.fields)
            .ok_or_else(|| SchemaError::UnknownStruct(object_type_or_struct.to_string()))
    }

    /// Codes of a value set.
    pub fn value_set(&self, name: &str) -> SchemaResult<&[String]> {
        self.value_sets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SchemaError::UnknownValueSet(name.to_string()))
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDocument {
    #[serde(default)]
    objects: BTreeMap<String, ObjectConfig>,
    #[serde(default)]
    structs: BTreeMap<String, StructConfig>,
    #[serde(default)]
    value_sets: BTreeMap<String, Vec<String>>,
}

/// Collects configs and checks them for consistency before freezing.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    objects: Vec<ObjectConfig>,
    structs: Vec<(String, FieldMap)>,
    value_sets: Vec<(String, Vec<String>)>,
}

impl SchemaRegistryBuilder {
    pub fn object(mut self, config: ObjectConfig) -> Self {
        self.objects.push(config);
        self
    }

    pub fn structure(mut self, name: impl Into<String>, fields: FieldMap) -> Self {
        self.structs.push((name.into(), fields));
        self
    }

    pub fn value_set<I, S>(mut self, name: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_sets
            .push((name.into(), codes.into_iter().map(Into::into).collect()));
        self
    }

    /// Freezes the registry. Fails on duplicate id codes or on fields that
    /// reference unregistered structs or value sets.
    pub fn build(self) -> SchemaResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::default();

        for (name, codes) in self.value_sets {
            registry.value_sets.insert(name, codes);
        }
        for (name, fields) in self.structs {
            registry.structs.insert(name, StructConfig { fields });
        }
        for config in self.objects {
            if let Some(first) = registry.codes.get(&config.code) {
                return Err(SchemaError::DuplicateCode {
                    code: config.code.clone(),
                    first: first.clone(),
                    second: config.object_type.clone(),
                });
            }
            registry
                .codes
                .insert(config.code.clone(), config.object_type.clone());
            registry.objects.insert(config.object_type.clone(), config);
        }

        let owners = registry
            .objects
            .iter()
            .map(|(name, c)| (name, &c.fields))
            .chain(registry.structs.iter().map(|(name, s)| (name, &s.fields)));
        for (owner, fields) in owners {
            for (field, def) in fields {
                let kind = match &def.kind {
                    FieldKind::Single(kind) | FieldKind::Array(kind) => kind,
                    _ => continue,
                };
                let dangling = match kind {
                    ValueKind::Struct(name) => (!registry.objects.contains_key(name)
                        && !registry.structs.contains_key(name))
                    .then(|| format!("struct {name}")),
                    ValueKind::ValueSet(name) => (!registry.value_sets.contains_key(name))
                        .then(|| format!("value set {name}")),
                    _ => None,
                };
                if let Some(target) = dangling {
                    return Err(SchemaError::DanglingReference {
                        owner: owner.clone(),
                        field: field.clone(),
                        target,
                    });
                }
            }
        }

        Ok(registry)
    }
}
