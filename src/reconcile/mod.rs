//! Dependency-ordered creation of missing entities on the target.
//!
//! Phases run strictly in this order:
//!
//! 1. collections, 2. fields, 3. relations (schema)
//! 4. roles, 5. policies (access control)
//! 6. flows, 7. operations and their links (automation)
//! 8. permissions
//!
//! Every individual create/patch is isolated: a rejected entity is recorded
//! in the report and the pass moves on. Nothing is ever updated in place or
//! deleted, except the link patches of entities created by the same run.

mod access;
mod automation;
pub mod report;
mod schema;

pub use report::{ApplyReport, EntityOutcome, GroupTally, Outcome, Phase, PhaseReport};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{RemoteApi, created_id};
use crate::diff::Diff;
use crate::models::InstanceState;
use crate::registry::IdRegistry;

/// Reason recorded for phases that need a live source connection.
pub const NO_SOURCE_REASON: &str = "source instance not connected (local snapshot mode)";

/// Applies a [`Diff`] to the target instance.
pub struct Reconciler<'a> {
    /// Source instance; required for operations and permissions
    source: Option<&'a dyn RemoteApi>,
    target: &'a dyn RemoteApi,
    registry: IdRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: Option<&'a dyn RemoteApi>, target: &'a dyn RemoteApi) -> Self {
        Self {
            source,
            target,
            registry: IdRegistry::new(),
        }
    }

    /// Identifier mappings recorded so far.
    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    /// Run every phase in order and collect their outcomes.
    ///
    /// `source` and `target` are the states the diff was computed from; their
    /// entity lists seed the name-based identifier matching.
    pub async fn run(
        &mut self,
        diff: &Diff,
        source: &InstanceState,
        target: &InstanceState,
    ) -> ApplyReport {
        let started_at = Utc::now();
        let mut phases = Vec::with_capacity(Phase::ALL.len());

        phases.push(self.create_collections(&diff.collections.new).await);
        phases.push(self.create_fields(&diff.fields.new).await);
        phases.push(self.create_relations(&diff.relations.new).await);
        phases.push(self.create_roles(&diff.roles.new, &target.roles).await);
        phases.push(
            self.create_policies(
                &diff.policies.new,
                &source.roles,
                &target.roles,
                &target.policies,
            )
            .await,
        );
        phases.push(self.create_flows(&diff.flows.new, &target.flows).await);
        phases.extend(self.create_operations(&diff.flows.new).await);
        phases.push(
            self.create_permissions(&source.policies, &target.policies)
                .await,
        );

        let report = ApplyReport {
            started_at,
            finished_at: Utc::now(),
            phases,
            id_mappings: self.registry.mappings(),
        };
        info!(
            succeeded = report.total_succeeded(),
            failed = report.total_failed(),
            "reconciliation finished"
        );
        report
    }

    /// POST one item, logging the outcome. Returns the created item or the
    /// failure reason.
    async fn create(&self, path: &str, entity: &str, body: &Value) -> Result<Value, String> {
        match self.target.create(path, body).await {
            Ok(item) => {
                debug!(path, entity, id = ?created_id(&item), "created");
                Ok(item)
            }
            Err(e) => {
                warn!(path, entity, error = %e, "creation failed");
                Err(e.to_string())
            }
        }
    }

    /// PATCH one item, logging the outcome.
    async fn patch(&self, path: &str, id: &str, entity: &str, body: &Value) -> Result<(), String> {
        match self.target.patch(path, id, body).await {
            Ok(_) => {
                debug!(path, id, entity, "patched");
                Ok(())
            }
            Err(e) => {
                warn!(path, id, entity, error = %e, "patch failed");
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SystemFieldFilter;
    use crate::models::{Flow, Policy, Role, Snapshot};
    use crate::registry::EntityKind;
    use crate::test_utils::MockApi;
    use serde_json::json;

    fn role(id: &str, name: &str) -> Role {
        Role {
            id: id.to_string(),
            name: name.to_string(),
            icon: None,
            description: None,
        }
    }

    fn policy(id: &str, name: &str, roles: &[&str]) -> Policy {
        serde_json::from_value(json!({ "id": id, "name": name, "roles": roles })).unwrap()
    }

    fn flow(id: &str, name: &str, operation: Option<&str>) -> Flow {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "trigger": "manual",
            "operation": operation
        }))
        .unwrap()
    }

    fn source_state() -> InstanceState {
        InstanceState {
            snapshot: Snapshot::from_value(json!({
                "data": {
                    "collections": [{ "collection": "articles" }],
                    "fields": [
                        { "collection": "articles", "field": "title", "type": "string" },
                        { "collection": "articles", "field": "body", "type": "text" }
                    ],
                    "relations": [
                        {
                            "collection": "articles",
                            "field": "author",
                            "related_collection": "directus_users"
                        }
                    ]
                }
            }))
            .unwrap(),
            roles: vec![role("r1", "Editor")],
            policies: vec![policy("p1", "EditorPolicy", &["r1"])],
            flows: vec![],
        }
    }

    #[tokio::test]
    async fn test_example_run_creates_in_dependency_order() {
        let source = source_state();
        let target = InstanceState::default();
        let diff = Diff::compute(&source, &target, &SystemFieldFilter::default());
        assert_eq!(diff.pending_changes(), 6);

        let source_api = MockApi::new("dev");
        let target_api = MockApi::new("prod");
        let mut reconciler = Reconciler::new(Some(&source_api), &target_api);
        let report = reconciler.run(&diff, &source, &target).await;

        let paths: Vec<String> = target_api.writes().into_iter().map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![
                "collections",
                "fields/articles",
                "fields/articles",
                "relations",
                "roles",
                "policies"
            ]
        );

        let role_id = reconciler.registry().get(EntityKind::Role, "r1");
        let policies = target_api.created("policies");
        assert_eq!(policies[0]["roles"], json!([role_id]));
        assert_eq!(report.created(Phase::Collections), 1);
        assert_eq!(report.created(Phase::Fields), 2);
        assert_eq!(report.created(Phase::Relations), 1);
        assert_eq!(report.created(Phase::Roles), 1);
        assert_eq!(report.created(Phase::Policies), 1);
        assert_eq!(report.total_failed(), 0);
    }

    #[tokio::test]
    async fn test_failed_entity_does_not_stop_phase() {
        let source = source_state();
        let target = InstanceState::default();
        let diff = Diff::compute(&source, &target, &SystemFieldFilter::default());

        let target_api =
            MockApi::new("prod").failing_create("fields/articles", "field", json!("title"));
        let mut reconciler = Reconciler::new(None, &target_api);
        let report = reconciler.run(&diff, &source, &target).await;

        let fields = report.phase(Phase::Fields).unwrap();
        assert_eq!(fields.succeeded(), 1);
        assert_eq!(fields.failed_count(), 1);
        let failures: Vec<_> = fields.failures().collect();
        assert_eq!(failures, vec![("articles.title", "HTTP 400: Invalid payload")]);
        // Later phases still ran
        assert_eq!(report.created(Phase::Relations), 1);
        assert_eq!(report.created(Phase::Policies), 1);
    }

    #[tokio::test]
    async fn test_failed_role_does_not_stop_other_roles_or_policies() {
        let mut source = source_state();
        source.roles = vec![
            role("r1", "Editor"),
            role("r2", "Reviewer"),
            role("r3", "Author"),
        ];
        source.policies = vec![policy("p1", "Publishing", &["r1", "r2", "r3"])];
        let target = InstanceState::default();
        let diff = Diff::compute(&source, &target, &SystemFieldFilter::default());

        let target_api =
            MockApi::new("prod").failing_create("roles", "name", json!("Reviewer"));
        let mut reconciler = Reconciler::new(None, &target_api);
        let report = reconciler.run(&diff, &source, &target).await;

        let roles = report.phase(Phase::Roles).unwrap();
        assert_eq!(roles.succeeded(), 2);
        let failures: Vec<_> = roles.failures().collect();
        assert_eq!(failures, vec![("Reviewer", "HTTP 400: Invalid payload")]);

        let registry = reconciler.registry();
        let editor = registry.get(EntityKind::Role, "r1").unwrap();
        let author = registry.get(EntityKind::Role, "r3").unwrap();
        assert!(!registry.contains(EntityKind::Role, "r2"));
        assert_eq!(target_api.created("roles").len(), 3);

        let policies = target_api.created("policies");
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["roles"], json!([editor, author]));
        assert_eq!(report.created(Phase::Policies), 1);

        let mapped_roles: Vec<&str> = report
            .id_mappings
            .iter()
            .filter(|m| m.kind == EntityKind::Role)
            .map(|m| m.source_id.as_str())
            .collect();
        assert_eq!(mapped_roles, vec!["r1", "r3"]);
    }

    #[tokio::test]
    async fn test_policy_reference_resolves_to_preexisting_role() {
        let mut source = source_state();
        source.roles = vec![role("r1", "Editor")];
        let target = InstanceState {
            roles: vec![role("prod-existing", "Editor")],
            ..Default::default()
        };
        let diff = Diff::compute(&source, &target, &SystemFieldFilter::default());
        assert!(diff.roles.new.is_empty());

        let target_api = MockApi::new("prod");
        let mut reconciler = Reconciler::new(None, &target_api);
        reconciler.run(&diff, &source, &target).await;

        let policies = target_api.created("policies");
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["roles"], json!(["prod-existing"]));
        assert!(target_api.created("roles").is_empty());
    }

    #[tokio::test]
    async fn test_local_mode_skips_source_dependent_phases() {
        let mut source = source_state();
        source.flows = vec![flow("f1", "Notify", Some("o1"))];
        let target = InstanceState::default();
        let diff = Diff::compute(&source, &target, &SystemFieldFilter::default());

        let target_api = MockApi::new("prod");
        let mut reconciler = Reconciler::new(None, &target_api);
        let report = reconciler.run(&diff, &source, &target).await;

        assert_eq!(report.created(Phase::Flows), 1);
        for phase in [
            Phase::Operations,
            Phase::OperationLinks,
            Phase::FlowLinks,
            Phase::Permissions,
        ] {
            assert_eq!(
                report.phase(phase).unwrap().skipped.as_deref(),
                Some(NO_SOURCE_REASON)
            );
        }
        assert_eq!(report.phases.len(), Phase::ALL.len());
    }

    #[tokio::test]
    async fn test_empty_diff_issues_no_creations() {
        let source = source_state();
        let diff = Diff::compute(&source, &source, &SystemFieldFilter::default());
        assert!(diff.is_empty());

        let target_api = MockApi::new("prod");
        let mut reconciler = Reconciler::new(None, &target_api);
        let report = reconciler.run(&diff, &source, &source).await;

        assert!(target_api.writes().is_empty());
        assert_eq!(report.total_succeeded(), 0);
    }
}
