//! Data models for platform configuration entities.
//!
//! This module defines the structures read from a snapshot or fetched as
//! independent entity lists:
//! - `Collection`, `Field`, `Relation` - schema entities carried by a [`Snapshot`]
//! - `Role`, `Policy`, `Permission` - access control
//! - `Flow`, `Operation` - automation graphs
//!
//! Schema entities keep every attribute they were read with (`rest`) so that
//! creation payloads replay the source definition verbatim.

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotData, SnapshotSummary};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Collection-name prefix of the platform's reserved namespace.
pub const SYSTEM_PREFIX: &str = "directus_";

/// Entities with a natural identity key used for matching across instances.
pub trait Keyed {
    /// Identity key, unique within one instance.
    fn key(&self) -> String;
}

/// A user-defined table and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name (identity)
    pub collection: String,

    /// Remaining schema/meta configuration, replayed as-is
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Keyed for Collection {
    fn key(&self) -> String {
        self.collection.clone()
    }
}

/// A column of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Owning collection
    pub collection: String,

    /// Field name
    pub field: String,

    /// Logical type (e.g., "string", "uuid", "alias")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// Structural (database) definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// Interface/display metadata, including `special` flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Field {
    /// Whether this field lives on a reserved-namespace collection.
    pub fn is_system(&self) -> bool {
        self.collection.starts_with(SYSTEM_PREFIX)
    }

    /// The `meta.special` behavioral flags, if any.
    pub fn special(&self) -> Option<&Value> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get("special"))
            .filter(|v| !v.is_null())
    }
}

impl Keyed for Field {
    fn key(&self) -> String {
        format!("{}.{}", self.collection, self.field)
    }
}

/// A link from a field to another collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub collection: String,

    pub field: String,

    /// Target collection; absent for many-to-any relations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_collection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Physical foreign-key definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Relation {
    /// Metadata-only creation body.
    ///
    /// The physical `schema` is never sent: a foreign-key constraint can fail
    /// or damage data when the two instances' storage engines or collations
    /// differ. The constraint can be added out-of-band later.
    pub fn creation_payload(&self) -> Value {
        json!({
            "collection": self.collection,
            "field": self.field,
            "related_collection": self.related_collection,
            "meta": self.meta,
        })
    }

    /// Display form: `collection.field -> related` (`M2A` when polymorphic).
    pub fn describe(&self) -> String {
        format!(
            "{}.{} -> {}",
            self.collection,
            self.field,
            self.related_collection.as_deref().unwrap_or("M2A")
        )
    }
}

impl Keyed for Relation {
    fn key(&self) -> String {
        format!("{}.{}", self.collection, self.field)
    }
}

/// A role users can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Role {
    pub fn creation_payload(&self) -> Value {
        json!({
            "name": self.name,
            "icon": self.icon,
            "description": self.description,
        })
    }
}

impl Keyed for Role {
    fn key(&self) -> String {
        self.name.clone()
    }
}

/// A named bundle of access rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// IP allow-list (array of CIDRs or null)
    #[serde(default)]
    pub ip_access: Option<Value>,

    #[serde(default)]
    pub enforce_tfa: bool,

    #[serde(default)]
    pub admin_access: bool,

    #[serde(default)]
    pub app_access: bool,

    /// Granting roles: plain role ids or access rows carrying a `role` id
    #[serde(default)]
    pub roles: Option<Vec<Value>>,
}

impl Policy {
    /// Role identifiers referenced by this policy.
    pub fn role_ids(&self) -> Vec<String> {
        self.roles
            .iter()
            .flatten()
            .filter_map(|entry| match entry {
                Value::String(id) => Some(id.clone()),
                Value::Object(row) => row.get("role").and_then(Value::as_str).map(String::from),
                _ => None,
            })
            .collect()
    }
}

impl Keyed for Policy {
    fn key(&self) -> String {
        self.name.clone()
    }
}

/// A named automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub trigger: Option<String>,

    #[serde(default)]
    pub accountability: Option<String>,

    #[serde(default)]
    pub options: Option<Value>,

    /// Entry operation
    #[serde(default)]
    pub operation: Option<String>,
}

impl Flow {
    /// Static attributes only; the entry operation is linked later.
    pub fn creation_payload(&self) -> Value {
        json!({
            "name": self.name,
            "icon": self.icon,
            "color": self.color,
            "description": self.description,
            "status": self.status,
            "trigger": self.trigger,
            "accountability": self.accountability,
            "options": self.options,
        })
    }
}

impl Keyed for Flow {
    fn key(&self) -> String {
        self.name.clone()
    }
}

/// A node of a flow's execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub key: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub position_x: i64,

    #[serde(default)]
    pub position_y: i64,

    #[serde(default)]
    pub options: Option<Value>,

    /// Owning flow
    pub flow: String,

    /// Successor on success
    #[serde(default)]
    pub resolve: Option<String>,

    /// Successor on failure
    #[serde(default)]
    pub reject: Option<String>,
}

impl Operation {
    /// Name for display, falling back to the key.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

/// An access rule of a policy on one collection and action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub policy: Option<String>,

    pub collection: String,

    pub action: String,

    #[serde(default)]
    pub permissions: Option<Value>,

    #[serde(default)]
    pub validation: Option<Value>,

    #[serde(default)]
    pub presets: Option<Value>,

    #[serde(default)]
    pub fields: Option<Value>,
}

impl Permission {
    /// Structural key under a given policy id.
    pub fn structural_key(policy: &str, collection: &str, action: &str) -> String {
        format!("{}:{}:{}", policy, collection, action)
    }
}

/// Everything read from one instance before diffing.
#[derive(Debug, Clone, Default)]
pub struct InstanceState {
    pub snapshot: Snapshot,
    pub roles: Vec<Role>,
    pub policies: Vec<Policy>,
    pub flows: Vec<Flow>,
}

impl InstanceState {
    /// State carrying only a schema snapshot (no access-control lists).
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }
}
