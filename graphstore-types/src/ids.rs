//! Identifier types used throughout graphstore.
//!
//! Object ids are `<code>_<uuid>` where `code` is the short object-type code
//! declared in the schema and the suffix is a UUID v7 in simple form. The
//! object type can therefore be resolved from an id without a store lookup.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const CODE_SEPARATOR: char = '_';

/// Identifier of a graph object. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Generates a fresh id for an object type with the given code.
    #[must_use]
    pub fn generate(code: &str) -> Self {
        Self(format!("{code}{CODE_SEPARATOR}{}", Uuid::now_v7().simple()))
    }

    /// Parses an object id from a string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s.rsplit_once(CODE_SEPARATOR) {
            Some((code, suffix)) if !code.is_empty() && !suffix.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(Error::InvalidObjectId(s.to_string())),
        }
    }

    /// Returns the object-type code embedded in the id.
    pub fn code(&self) -> &str {
        self.0
            .rsplit_once(CODE_SEPARATOR)
            .map(|(code, _)| code)
            .unwrap_or_default()
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A directed, named relationship `(src, edge_name, dst)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeTriple {
    pub src: ObjectId,
    pub edge_name: String,
    pub dst: ObjectId,
}

impl EdgeTriple {
    /// Creates a new edge triple.
    pub fn new(src: ObjectId, edge_name: impl Into<String>, dst: ObjectId) -> Self {
        Self {
            src,
            edge_name: edge_name.into(),
            dst,
        }
    }
}

impl fmt::Display for EdgeTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.src, self.edge_name, self.dst)
    }
}
