use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every object carries that are never validated against its schema.
pub const FIXED_OBJECT_FIELDS: &[&str] = &[
    "id",
    "object_type",
    "created_at",
    "updated_at",
    "deleted_at",
    "created_by",
];

/// The body of a graph object.
///
/// All domain data flows through this type. Besides the fixed fields
/// (`id`, `object_type`, timestamps) the body holds arbitrary JSON whose
/// shape is defined by the object type's schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphObject(Map<String, Value>);

impl GraphObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn object_type(&self) -> Option<&str> {
        self.get_str("object_type")
    }

    /// The soft-delete marker. `Some` means the object is tombstoned.
    pub fn deleted_at(&self) -> Option<&str> {
        self.get_str("deleted_at")
    }

    pub fn is_deleted(&self) -> bool {
        self.0.get("deleted_at").is_some_and(|v| !v.is_null())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Extract a string value for a top-level field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Returns the field value if it is present and not `null`.
    pub fn value_of(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays `patch` on top of this body. Fields set to `null` in the
    /// patch are removed rather than stored.
    pub fn merge(&mut self, patch: &GraphObject) {
        for (field, value) in patch.iter() {
            if value.is_null() {
                self.0.remove(field);
            } else {
                self.0.insert(field.clone(), value.clone());
            }
        }
    }

    /// Returns a copy without the given fields.
    #[must_use]
    pub fn without<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut copy = self.clone();
        for field in fields {
            copy.0.remove(field);
        }
        copy
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Interprets a JSON value as an object body. Non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for GraphObject {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for GraphObject {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
