//! Data model shared by the feed: records, sponsor entities and their ids.
//!
//! Records come from the filtered-list endpoint and are kept exactly as the
//! server ordered them. Sponsors are the joined secondary entities, resolved
//! by id and cached for the whole session.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// =========================================================================
// Identifiers
// =========================================================================

/// Opaque identifier for records and sponsors.
///
/// CMS payloads mix numeric and string ids, so both `42` and `"42"`
/// deserialize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id out of a loose JSON value (string, integer, or `{ "id": .. }`).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            Value::Object(obj) => obj.get("id").and_then(Self::from_json),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::String(_) | Value::Number(_) => Id::from_json(&value)
                .ok_or_else(|| de::Error::custom(format!("invalid id: {}", value))),
            other => Err(de::Error::custom(format!(
                "id must be a string or integer, got {}",
                other
            ))),
        }
    }
}

// =========================================================================
// Records
// =========================================================================

/// One filterable entry returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Id,
    /// Every other field of the payload, in server order
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder used mostly by tests and mock sources.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Media reference held in `field`: a plain string or an object with a `url`.
    pub fn media_ref(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Foreign sponsor ids held in `field`, first occurrence wins.
    ///
    /// Anything that is not an array yields no ids.
    pub fn sponsor_ids(&self, field: &str) -> Vec<Id> {
        let Some(Value::Array(items)) = self.fields.get(field) else {
            return Vec::new();
        };

        let mut ids: Vec<Id> = Vec::with_capacity(items.len());
        for id in items.iter().filter_map(Id::from_json) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

// =========================================================================
// Secondary entities
// =========================================================================

/// A sponsor joined onto records by id. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryEntity {
    pub id: Id,
    #[serde(rename = "displayName", alias = "display_name", alias = "name", alias = "title")]
    pub display_name: String,
    #[serde(
        rename = "logoUrl",
        alias = "logo_url",
        alias = "logo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub logo_url: Option<String>,
}

impl SecondaryEntity {
    pub fn new(id: impl Into<Id>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            logo_url: None,
        }
    }

    pub fn with_logo(mut self, url: impl Into<String>) -> Self {
        self.logo_url = Some(url.into());
        self
    }
}

/// Point-in-time view of resolved sponsors, keyed by id.
pub type EntityMap = HashMap<Id, Arc<SecondaryEntity>>;
