//! Domain types for the persisted server collections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StateError;

/// Identifier of a compute instance (a DigitalOcean droplet).
pub type DropletId = u64;

/// Document field holding the id of the backing compute instance.
pub const DROPLET_ID_FIELD: &str = "droplet_id";

/// Camel-case spelling written by older provisioners.
pub const DROPLET_ID_ALIAS: &str = "dropletId";

// ── Collection ────────────────────────────────────────────────────

/// The persisted collections the reconciler knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Game server metadata.
    Servers,
    /// Network address leases, tracked separately from server metadata.
    ServerIps,
}

impl Collection {
    /// Reconciliation order.
    pub const ALL: [Collection; 2] = [Collection::Servers, Collection::ServerIps];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Servers => "servers",
            Collection::ServerIps => "server_ips",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "servers" => Ok(Collection::Servers),
            "server_ips" => Ok(Collection::ServerIps),
            other => Err(StateError::UnknownCollection(other.to_string())),
        }
    }
}

// ── Document ──────────────────────────────────────────────────────

/// A stored document: a collection-scoped id plus opaque fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Outcome of reading the droplet reference from a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DropletRef {
    /// No droplet field, or an explicit null.
    Absent,
    /// A usable instance id.
    Id(DropletId),
    /// The field is present but does not hold an integer.
    Invalid(Value),
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Classify the droplet reference carried by this document.
    pub fn droplet_ref(&self) -> DropletRef {
        // A null primary field still defers to the alias.
        let value = match self.field(DROPLET_ID_FIELD) {
            None | Some(Value::Null) => self.field(DROPLET_ID_ALIAS),
            primary => primary,
        };

        match value {
            None | Some(Value::Null) => DropletRef::Absent,
            Some(Value::Number(n)) => match n.as_u64() {
                Some(id) => DropletRef::Id(id),
                None => DropletRef::Invalid(Value::Number(n.clone())),
            },
            Some(Value::String(s)) => match s.trim().parse::<DropletId>() {
                Ok(id) => DropletRef::Id(id),
                Err(_) => DropletRef::Invalid(Value::String(s.clone())),
            },
            Some(other) => DropletRef::Invalid(other.clone()),
        }
    }

    /// The backing instance id, if the document carries a usable one.
    pub fn droplet_id(&self) -> Option<DropletId> {
        match self.droplet_ref() {
            DropletRef::Id(id) => Some(id),
            _ => None,
        }
    }
}
