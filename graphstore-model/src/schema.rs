use crate::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field name that matches any field not otherwise declared.
pub const WILDCARD_FIELD: &str = "_any";

/// Field definitions keyed by field name.
pub type FieldMap = BTreeMap<String, FieldDef>;

/// Where the body of an object type lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheLevel {
    /// Body lives only in the primary store.
    #[default]
    None,
    /// Cache mirrors the body; the primary store is written through.
    External,
    /// Cache is the sole store of the body.
    OnlyCache,
}

/// The kind of a single (non-array) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    String,
    /// A string that must look like an e-mail address.
    Email,
    Number,
    Boolean,
    /// RFC 3339 date-time or `YYYY-MM-DD`.
    Date,
    /// Reference to another object whose type must be one of these.
    ObjectId(Vec<String>),
    /// Nested struct validated recursively against the named schema.
    Struct(String),
    /// Code from the named value set.
    ValueSet(String),
}

/// The closed set of field kinds the validator dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque JSON, accepted as-is.
    Json,
    /// Server-reconciled integer, written through modifiers.
    Counter,
    Single(ValueKind),
    Array(ValueKind),
}

impl FieldKind {
    pub fn is_counter(&self) -> bool {
        matches!(self, Self::Counter)
    }

    fn value_kind(&self) -> Option<&ValueKind> {
        match self {
            Self::Single(kind) | Self::Array(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Email => f.write_str("string<email>"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::ObjectId(_) => f.write_str("object-id"),
            Self::Struct(name) => write!(f, "struct<{name}>"),
            Self::ValueSet(name) => write!(f, "value-set<{name}>"),
        }
    }
}

/// Friendly type label used in validation errors, e.g. `array:struct<exam-grade-group>`.
impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Counter => f.write_str("counter"),
            Self::Single(kind) => write!(f, "{kind}"),
            Self::Array(kind) => write!(f, "array:{kind}"),
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDef", into = "RawFieldDef")]
pub struct FieldDef {
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    /// Value filled in on create when the payload omits the field.
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            unique: false,
            default: None,
        }
    }

    pub fn json() -> Self {
        Self::new(FieldKind::Json)
    }

    pub fn counter() -> Self {
        Self::new(FieldKind::Counter)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::Single(ValueKind::String))
    }

    pub fn email() -> Self {
        Self::new(FieldKind::Single(ValueKind::Email))
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Single(ValueKind::Number))
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Single(ValueKind::Boolean))
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Single(ValueKind::Date))
    }

    pub fn object_id(object_types: &[&str]) -> Self {
        Self::new(FieldKind::Single(ValueKind::ObjectId(
            object_types.iter().map(|t| t.to_string()).collect(),
        )))
    }

    pub fn structure(name: &str) -> Self {
        Self::new(FieldKind::Single(ValueKind::Struct(name.into())))
    }

    pub fn value_set(name: &str) -> Self {
        Self::new(FieldKind::Single(ValueKind::ValueSet(name.into())))
    }

    /// Turns a single-value definition into its array form.
    pub fn array(mut self) -> Self {
        if let FieldKind::Single(kind) = self.kind {
            self.kind = FieldKind::Array(kind);
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// The struct this field nests, if any.
    pub fn struct_name(&self) -> Option<&str> {
        match self.kind.value_kind() {
            Some(ValueKind::Struct(name)) => Some(name),
            _ => None,
        }
    }

    /// The value set this field draws codes from, if any.
    pub fn value_set_name(&self) -> Option<&str> {
        match self.kind.value_kind() {
            Some(ValueKind::ValueSet(name)) => Some(name),
            _ => None,
        }
    }
}

/// Wire shape of a field definition: `{"type": "array:struct", "struct": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldDef {
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#struct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl TryFrom<RawFieldDef> for FieldDef {
    type Error = SchemaError;

    fn try_from(raw: RawFieldDef) -> Result<Self, Self::Error> {
        let (is_array, base) = match raw.field_type.strip_prefix("array:") {
            Some(rest) => (true, rest),
            None => (false, raw.field_type.as_str()),
        };
        let missing = |attr: &str| {
            SchemaError::InvalidFieldType(format!("{} requires `{attr}`", raw.field_type))
        };

        let value_kind = match base {
            "json" | "counter" if is_array => {
                return Err(SchemaError::InvalidFieldType(raw.field_type.clone()));
            }
            "json" => None,
            "counter" => None,
            "string" if raw.schema.as_deref() == Some("email") => Some(ValueKind::Email),
            "string" => Some(ValueKind::String),
            "number" => Some(ValueKind::Number),
            "boolean" => Some(ValueKind::Boolean),
            "date" => Some(ValueKind::Date),
            "object-id" => Some(ValueKind::ObjectId(
                raw.object_types.clone().unwrap_or_default(),
            )),
            "struct" => Some(ValueKind::Struct(
                raw.r#struct.clone().ok_or_else(|| missing("struct"))?,
            )),
            "value-set" => Some(ValueKind::ValueSet(
                raw.value_set.clone().ok_or_else(|| missing("valueSet"))?,
            )),
            _ => return Err(SchemaError::InvalidFieldType(raw.field_type.clone())),
        };

        let kind = match (base, value_kind) {
            ("counter", _) => FieldKind::Counter,
            (_, None) => FieldKind::Json,
            (_, Some(kind)) if is_array => FieldKind::Array(kind),
            (_, Some(kind)) => FieldKind::Single(kind),
        };

        Ok(Self {
            kind,
            required: raw.required,
            unique: raw.unique,
            default: raw.default,
        })
    }
}

impl From<FieldDef> for RawFieldDef {
    fn from(def: FieldDef) -> Self {
        let mut raw = RawFieldDef {
            field_type: String::new(),
            required: def.required,
            unique: def.unique,
            schema: None,
            r#struct: None,
            value_set: None,
            object_types: None,
            default: def.default,
        };
        let (prefix, kind) = match def.kind {
            FieldKind::Json => {
                raw.field_type = "json".into();
                return raw;
            }
            FieldKind::Counter => {
                raw.field_type = "counter".into();
                return raw;
            }
            FieldKind::Single(kind) => ("", kind),
            FieldKind::Array(kind) => ("array:", kind),
        };
        let base = match kind {
            ValueKind::String => "string",
            ValueKind::Email => {
                raw.schema = Some("email".into());
                "string"
            }
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::ObjectId(types) => {
                raw.object_types = Some(types);
                "object-id"
            }
            ValueKind::Struct(name) => {
                raw.r#struct = Some(name);
                "struct"
            }
            ValueKind::ValueSet(name) => {
                raw.value_set = Some(name);
                "value-set"
            }
        };
        raw.field_type = format!("{prefix}{base}");
        raw
    }
}

/// Declaration of an edge an object type may have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDef {
    #[serde(default)]
    pub object_types: Vec<String>,
}

/// Schema of a nested struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructConfig {
    #[serde(default)]
    pub fields: FieldMap,
}

/// Per-object-type schema. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectConfig {
    /// Filled in from the registry key when loaded from a document.
    #[serde(default)]
    pub object_type: String,
    /// Short code embedded as the prefix of every id of this type.
    pub code: String,
    #[serde(default)]
    pub cache_level: CacheLevel,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeDef>,
}

impl ObjectConfig {
    pub fn new(object_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            code: code.into(),
            cache_level: CacheLevel::None,
            fields: FieldMap::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn with_cache_level(mut self, level: CacheLevel) -> Self {
        self.cache_level = level;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn with_edge(mut self, name: impl Into<String>, object_types: &[&str]) -> Self {
        self.edges.insert(
            name.into(),
            EdgeDef {
                object_types: object_types.iter().map(|t| t.to_string()).collect(),
            },
        );
        self
    }

    /// Names of the declared counter fields.
    pub fn counter_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.kind.is_counter())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of the fields declared unique.
    pub fn unique_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.unique)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }
}
