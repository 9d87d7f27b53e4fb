//! Change events.
//!
//! A change event is the immutable record of one committed mutation. It is
//! built exactly once per mutation and fanned out to the sync pipeline and the
//! queue before the mutation call returns.

use crate::{EdgeTriple, ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Operation verb. Mutations use `Post`, `Patch` and `Delete`; `Get` only
/// appears in hook keys for read post-logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of record the event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Object,
}

/// An event announcing a committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique identifier for this event.
    pub id: EventId,

    pub method: Method,

    /// `<objectType>` for object mutations, `<srcType>/<edgeName>` for edges.
    pub path: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    /// State before the mutation (absent on create).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,

    /// State after the mutation (absent on edge delete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ChangeEvent {
    fn new(
        method: Method,
        path: String,
        previous: Option<Value>,
        current: Option<Value>,
        author: Option<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            method,
            path,
            kind: EventKind::Object,
            previous,
            current,
            author,
        }
    }

    /// An object was created.
    #[must_use]
    pub fn object_created(object_type: &str, current: Value, author: Option<String>) -> Self {
        Self::new(Method::Post, object_type.to_string(), None, Some(current), author)
    }

    /// An object was updated.
    #[must_use]
    pub fn object_updated(
        object_type: &str,
        previous: Value,
        current: Value,
        author: Option<String>,
    ) -> Self {
        Self::new(
            Method::Patch,
            object_type.to_string(),
            Some(previous),
            Some(current),
            author,
        )
    }

    /// An object was soft-deleted.
    #[must_use]
    pub fn object_deleted(
        object_type: &str,
        previous: Value,
        current: Value,
        author: Option<String>,
    ) -> Self {
        Self::new(
            Method::Delete,
            object_type.to_string(),
            Some(previous),
            Some(current),
            author,
        )
    }

    /// An edge was created.
    #[must_use]
    pub fn edge_created(src_type: &str, edge: &EdgeTriple, author: Option<String>) -> Self {
        Self::new(
            Method::Post,
            format!("{src_type}/{}", edge.edge_name),
            None,
            Some(edge_value(edge)),
            author,
        )
    }

    /// An edge was deleted.
    #[must_use]
    pub fn edge_deleted(src_type: &str, edge: &EdgeTriple, author: Option<String>) -> Self {
        Self::new(
            Method::Delete,
            format!("{src_type}/{}", edge.edge_name),
            Some(edge_value(edge)),
            None,
            author,
        )
    }

    /// The `"<METHOD> <path>"` key used to look up triggers.
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Returns the id of the object this event is about, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.current
            .as_ref()
            .or(self.previous.as_ref())
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .and_then(|s| ObjectId::parse(s).ok())
    }
}

fn edge_value(edge: &EdgeTriple) -> Value {
    serde_json::json!({
        "src": edge.src.as_str(),
        "edgeName": edge.edge_name,
        "dst": edge.dst.as_str(),
    })
}
