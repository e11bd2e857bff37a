//! Entity differ.
//!
//! Pure comparison of source and target configuration. Each entity type is
//! matched by its identity key ([`Keyed::key`]); only fields define change
//! detection. Nothing here touches the network or the identifier registry.

mod filter;

pub use filter::{DEFAULT_MARKERS, SystemFieldFilter};

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Collection, Field, Flow, InstanceState, Keyed, Policy, Relation, Role};

/// Maximum number of sample identities kept per entity type in reports.
pub const SAMPLE_LIMIT: usize = 10;

/// Result of comparing one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffSet<T> {
    /// Present in the source, absent from the target
    pub new: Vec<T>,
    /// Present on both sides with differing comparison attributes
    pub updated: Vec<T>,
    /// Number of source entities compared
    pub source_count: usize,
    /// Number of target entities compared
    pub target_count: usize,
}

impl<T> Default for DiffSet<T> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            updated: Vec::new(),
            source_count: 0,
            target_count: 0,
        }
    }
}

impl<T: Keyed> DiffSet<T> {
    /// Summary for reports.
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            source: self.source_count,
            target: self.target_count,
            new: self.new.len(),
            updated: self.updated.len(),
            samples: self.new.iter().take(SAMPLE_LIMIT).map(Keyed::key).collect(),
        }
    }
}

/// Counts and sample identities of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub source: usize,
    pub target: usize,
    pub new: usize,
    pub updated: usize,
    pub samples: Vec<String>,
}

/// Source entities whose key is absent from the target.
pub fn diff_by_key<T: Keyed + Clone>(source: &[T], target: &[T]) -> DiffSet<T> {
    let target_keys: HashSet<String> = target.iter().map(Keyed::key).collect();
    DiffSet {
        new: source
            .iter()
            .filter(|entity| !target_keys.contains(&entity.key()))
            .cloned()
            .collect(),
        updated: Vec::new(),
        source_count: source.len(),
        target_count: target.len(),
    }
}

/// Like [`diff_by_key`], additionally reporting matched entities for which
/// `changed(source, target)` holds.
pub fn diff_with_changes<T, F>(source: &[T], target: &[T], changed: F) -> DiffSet<T>
where
    T: Keyed + Clone,
    F: Fn(&T, &T) -> bool,
{
    let target_by_key: HashMap<String, &T> =
        target.iter().map(|entity| (entity.key(), entity)).collect();

    let mut set = DiffSet {
        source_count: source.len(),
        target_count: target.len(),
        ..Default::default()
    };
    for entity in source {
        match target_by_key.get(&entity.key()) {
            None => set.new.push(entity.clone()),
            Some(&existing) if changed(entity, existing) => set.updated.push(entity.clone()),
            Some(_) => {}
        }
    }
    set
}

/// Whether a field's definition differs between instances.
///
/// Compares the logical type, the structural schema and the `meta.special`
/// flags. JSON values compare structurally, so key order is irrelevant.
pub fn field_changed(source: &Field, target: &Field) -> bool {
    source.field_type != target.field_type
        || normalized(&source.schema) != normalized(&target.schema)
        || source.special() != target.special()
}

fn normalized(value: &Option<serde_json::Value>) -> Option<&serde_json::Value> {
    value.as_ref().filter(|v| !v.is_null())
}

pub fn diff_collections(source: &[Collection], target: &[Collection]) -> DiffSet<Collection> {
    diff_by_key(source, target)
}

/// Compare regular and system fields together.
pub fn diff_fields<'a>(
    source: impl Iterator<Item = &'a Field>,
    target: impl Iterator<Item = &'a Field>,
) -> DiffSet<Field> {
    let source: Vec<Field> = source.cloned().collect();
    let target: Vec<Field> = target.cloned().collect();
    diff_with_changes(&source, &target, field_changed)
}

pub fn diff_relations(source: &[Relation], target: &[Relation]) -> DiffSet<Relation> {
    diff_by_key(source, target)
}

pub fn diff_roles(source: &[Role], target: &[Role]) -> DiffSet<Role> {
    diff_by_key(source, target)
}

pub fn diff_policies(source: &[Policy], target: &[Policy]) -> DiffSet<Policy> {
    diff_by_key(source, target)
}

pub fn diff_flows(source: &[Flow], target: &[Flow]) -> DiffSet<Flow> {
    diff_by_key(source, target)
}

/// Full comparison of two instances.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub collections: DiffSet<Collection>,
    pub fields: DiffSet<Field>,
    /// New reserved-namespace fields dropped by the system-field filter
    pub ignored_system_fields: usize,
    pub relations: DiffSet<Relation>,
    pub roles: DiffSet<Role>,
    pub policies: DiffSet<Policy>,
    pub flows: DiffSet<Flow>,
}

impl Diff {
    /// Compare source and target, applying the system-field filter to new fields.
    pub fn compute(
        source: &InstanceState,
        target: &InstanceState,
        filter: &SystemFieldFilter,
    ) -> Self {
        let mut fields = diff_fields(source.snapshot.all_fields(), target.snapshot.all_fields());
        let before = fields.new.len();
        fields.new.retain(|field| filter.retains(field));
        let ignored_system_fields = before - fields.new.len();

        Self {
            collections: diff_collections(
                &source.snapshot.data.collections,
                &target.snapshot.data.collections,
            ),
            fields,
            ignored_system_fields,
            relations: diff_relations(
                &source.snapshot.data.relations,
                &target.snapshot.data.relations,
            ),
            roles: diff_roles(&source.roles, &target.roles),
            policies: diff_policies(&source.policies, &target.policies),
            flows: diff_flows(&source.flows, &target.flows),
        }
    }

    /// Number of entities the reconciler would create.
    ///
    /// Updated fields are diagnostic only and never counted.
    pub fn pending_changes(&self) -> usize {
        self.collections.new.len()
            + self.fields.new.len()
            + self.relations.new.len()
            + self.roles.new.len()
            + self.policies.new.len()
            + self.flows.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_changes() == 0
    }

    /// Relation samples rendered with their target collection.
    pub fn relation_samples(&self) -> Vec<String> {
        self.relations
            .new
            .iter()
            .take(SAMPLE_LIMIT)
            .map(Relation::describe)
            .collect()
    }
}
