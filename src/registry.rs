//! Source-to-target identifier registry.
//!
//! When an entity is created on the target it receives a new identifier.
//! Entities created later that reference it (policies -> roles,
//! operations -> flows and sibling operations, permissions -> policies) are
//! rewritten through this registry. Entries are also recorded for
//! pre-existing target entities matched by name, so re-runs resolve
//! references created by earlier runs.
//!
//! The registry only grows: a recorded mapping is never replaced or removed.

use std::collections::HashMap;

use serde::Serialize;

/// Entity types tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Role,
    Policy,
    Flow,
    Operation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Role, Self::Policy, Self::Flow, Self::Operation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Policy => "policy",
            Self::Flow => "flow",
            Self::Operation => "operation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded source-to-target identifier pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdMapping {
    pub kind: EntityKind,
    pub source_id: String,
    pub target_id: String,
}

/// Per-kind maps from source identifier to target identifier.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    maps: HashMap<EntityKind, HashMap<String, String>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source_id -> target_id`.
    ///
    /// Returns `false` (and keeps the existing entry) if `source_id` is
    /// already mapped.
    pub fn set(&mut self, kind: EntityKind, source_id: &str, target_id: &str) -> bool {
        let map = self.maps.entry(kind).or_default();
        if map.contains_key(source_id) {
            return false;
        }
        map.insert(source_id.to_string(), target_id.to_string());
        true
    }

    pub fn get(&self, kind: EntityKind, source_id: &str) -> Option<&str> {
        self.maps
            .get(&kind)
            .and_then(|map| map.get(source_id))
            .map(String::as_str)
    }

    pub fn contains(&self, kind: EntityKind, source_id: &str) -> bool {
        self.get(kind, source_id).is_some()
    }

    /// Number of mappings recorded for `kind`.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.maps.get(&kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }

    /// Source identifiers mapped for `kind`, in no particular order.
    pub fn source_ids(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        self.maps
            .get(&kind)
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Every recorded mapping, grouped by kind and sorted by source id.
    pub fn mappings(&self) -> Vec<IdMapping> {
        let mut mappings = Vec::new();
        for kind in EntityKind::ALL {
            let mut source_ids: Vec<&str> = self.source_ids(kind).collect();
            source_ids.sort_unstable();
            for source_id in source_ids {
                if let Some(target_id) = self.get(kind, source_id) {
                    mappings.push(IdMapping {
                        kind,
                        source_id: source_id.to_string(),
                        target_id: target_id.to_string(),
                    });
                }
            }
        }
        mappings
    }

    /// Map each source entity to the target entity with the same name.
    ///
    /// `source` and `target` yield `(id, name)` pairs. Already-mapped source
    /// ids are left untouched. Returns the number of new mappings.
    pub fn match_by_name<'a, S, T>(&mut self, kind: EntityKind, source: S, target: T) -> usize
    where
        S: IntoIterator<Item = (&'a str, &'a str)>,
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut target_by_name: HashMap<&str, &str> = HashMap::new();
        for (id, name) in target {
            // First target entity wins when names repeat
            target_by_name.entry(name).or_insert(id);
        }

        let mut added = 0;
        for (source_id, name) in source {
            if let Some(target_id) = target_by_name.get(name) {
                if self.set(kind, source_id, target_id) {
                    added += 1;
                }
            }
        }
        added
    }
}
