//! Schema snapshot document.
//!
//! A snapshot is the point-in-time export of an instance's schema, as returned
//! by `GET /schema/snapshot`. The document wraps everything in a `data`
//! envelope:
//!
//! ```json
//! { "data": { "collections": [], "fields": [], "systemFields": [], "relations": [] } }
//! ```
//!
//! Every section is optional; a missing section reads as empty.

use serde::{Deserialize, Serialize};

use super::{Collection, Field, Relation};

/// A schema snapshot of one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub data: SnapshotData,
}

/// The four ordered sections of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub collections: Vec<Collection>,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, rename = "systemFields")]
    pub system_fields: Vec<Field>,

    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Snapshot {
    /// Parse a snapshot from a raw JSON document.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| crate::Error::InvalidSnapshot(e.to_string()))
    }

    /// Regular fields followed by system fields.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.data.fields.iter().chain(self.data.system_fields.iter())
    }

    /// Section counts for display.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            collections: self.data.collections.len(),
            fields: self.data.fields.len(),
            system_fields: self.data.system_fields.len(),
            relations: self.data.relations.len(),
        }
    }
}

/// Number of entries in each snapshot section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub collections: usize,
    pub fields: usize,
    pub system_fields: usize,
    pub relations: usize,
}

impl std::fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} collections, {} fields, {} system fields, {} relations",
            self.collections, self.fields, self.system_fields, self.relations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Keyed;
    use serde_json::json;

    #[test]
    fn test_snapshot_missing_sections_default_to_empty() {
        let snapshot = Snapshot::from_value(json!({ "data": { "collections": [] } })).unwrap();
        assert!(snapshot.data.fields.is_empty());
        assert!(snapshot.data.system_fields.is_empty());
        assert!(snapshot.data.relations.is_empty());
    }

    #[test]
    fn test_snapshot_without_data_envelope() {
        let snapshot = Snapshot::from_value(json!({})).unwrap();
        assert_eq!(snapshot.summary(), SnapshotSummary::default());
    }

    #[test]
    fn test_snapshot_reads_system_fields_section() {
        let snapshot = Snapshot::from_value(json!({
            "data": {
                "fields": [{ "collection": "articles", "field": "title", "type": "string" }],
                "systemFields": [{ "collection": "directus_users", "field": "tenant" }]
            }
        }))
        .unwrap();

        let keys: Vec<String> = snapshot.all_fields().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["articles.title", "directus_users.tenant"]);
        assert_eq!(snapshot.summary().system_fields, 1);
    }

    #[test]
    fn test_snapshot_rejects_malformed_section() {
        let result = Snapshot::from_value(json!({ "data": { "collections": "nope" } }));
        assert!(matches!(result, Err(crate::Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_summary_display() {
        let summary = SnapshotSummary {
            collections: 2,
            fields: 5,
            system_fields: 1,
            relations: 3,
        };
        assert_eq!(
            summary.to_string(),
            "2 collections, 5 fields, 1 system fields, 3 relations"
        );
    }
}
