//! Automation phases: flows and their operation graphs.
//!
//! Operations reference their flow and sibling operations, so the graph is
//! rebuilt in three passes: create every operation unlinked, patch the
//! `resolve`/`reject` links once all operations have target ids, then point
//! each new flow at its entry operation.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::{NO_SOURCE_REASON, Phase, PhaseReport, Reconciler};
use crate::client::{created_id, list_as, resource};
use crate::models::{Flow, Operation};
use crate::registry::EntityKind;

impl Reconciler<'_> {
    pub(super) async fn create_flows(
        &mut self,
        flows: &[Flow],
        target_flows: &[Flow],
    ) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Flows);
        for flow in flows {
            match self
                .create(resource::FLOWS, &flow.name, &flow.creation_payload())
                .await
            {
                Ok(item) => {
                    let id = created_id(&item);
                    if let Some(id) = &id {
                        self.registry.set(EntityKind::Flow, &flow.id, id);
                    }
                    report.applied(&flow.name, id);
                }
                Err(reason) => report.failed(&flow.name, reason),
            }
        }

        self.registry.match_by_name(
            EntityKind::Flow,
            flows.iter().map(|f| (f.id.as_str(), f.name.as_str())),
            target_flows.iter().map(|f| (f.id.as_str(), f.name.as_str())),
        );
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "flows phase done"
        );
        report
    }

    /// Rebuild the operation graphs of mapped flows.
    ///
    /// Returns the operations, operation-links and flow-links phase reports.
    pub(super) async fn create_operations(&mut self, new_flows: &[Flow]) -> [PhaseReport; 3] {
        let Some(source) = self.source else {
            return [
                PhaseReport::skipped(Phase::Operations, NO_SOURCE_REASON),
                PhaseReport::skipped(Phase::OperationLinks, NO_SOURCE_REASON),
                PhaseReport::skipped(Phase::FlowLinks, NO_SOURCE_REASON),
            ];
        };
        if self.registry.is_empty(EntityKind::Flow) {
            return [
                PhaseReport::new(Phase::Operations),
                PhaseReport::new(Phase::OperationLinks),
                PhaseReport::new(Phase::FlowLinks),
            ];
        }

        let operations = match list_as::<Operation>(source, resource::OPERATIONS).await {
            Ok(operations) => operations,
            Err(e) => {
                warn!(error = %e, "could not list source operations");
                let reason = format!("could not list source operations: {}", e);
                return [
                    PhaseReport::skipped(Phase::Operations, reason.clone()),
                    PhaseReport::skipped(Phase::OperationLinks, reason.clone()),
                    PhaseReport::skipped(Phase::FlowLinks, reason),
                ];
            }
        };
        let operations: Vec<Operation> = operations
            .into_iter()
            .filter(|op| self.registry.contains(EntityKind::Flow, &op.flow))
            .collect();

        let created = self.create_unlinked_operations(&operations).await;
        let linked = self.link_operations(&operations).await;
        let entries = self.link_flow_entries(new_flows).await;
        [created, linked, entries]
    }

    async fn create_unlinked_operations(&mut self, operations: &[Operation]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::Operations);
        for op in operations {
            let flow = self.rewrite_reference(EntityKind::Flow, &op.flow, op.label());
            let body = json!({
                "name": op.name,
                "key": op.key,
                "type": op.kind,
                "position_x": op.position_x,
                "position_y": op.position_y,
                "options": op.options,
                "flow": flow,
                "resolve": null,
                "reject": null,
            });
            match self.create(resource::OPERATIONS, op.label(), &body).await {
                Ok(item) => {
                    let id = created_id(&item);
                    if let Some(id) = &id {
                        self.registry.set(EntityKind::Operation, &op.id, id);
                    }
                    report.applied(op.label(), id);
                }
                Err(reason) => report.failed(op.label(), reason),
            }
        }
        info!(
            created = report.succeeded(),
            failed = report.failed_count(),
            "operations phase done"
        );
        report
    }

    /// Restore `resolve`/`reject` links of created operations.
    async fn link_operations(&self, operations: &[Operation]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::OperationLinks);
        for op in operations {
            let Some(target_id) = self.registry.get(EntityKind::Operation, &op.id) else {
                continue;
            };

            let mut links = Map::new();
            if let Some(resolve) = &op.resolve {
                let id = self.rewrite_reference(EntityKind::Operation, resolve, op.label());
                links.insert("resolve".to_string(), Value::String(id));
            }
            if let Some(reject) = &op.reject {
                let id = self.rewrite_reference(EntityKind::Operation, reject, op.label());
                links.insert("reject".to_string(), Value::String(id));
            }
            if links.is_empty() {
                continue;
            }

            let body = Value::Object(links);
            match self
                .patch(resource::OPERATIONS, target_id, op.label(), &body)
                .await
            {
                Ok(()) => report.applied(op.label(), Some(target_id.to_string())),
                Err(reason) => report.failed(op.label(), reason),
            }
        }
        report
    }

    /// Point each newly created flow at its rewritten entry operation.
    async fn link_flow_entries(&self, new_flows: &[Flow]) -> PhaseReport {
        let mut report = PhaseReport::new(Phase::FlowLinks);
        for flow in new_flows {
            let Some(entry) = &flow.operation else {
                continue;
            };
            let (Some(flow_id), Some(entry_id)) = (
                self.registry.get(EntityKind::Flow, &flow.id),
                self.registry.get(EntityKind::Operation, entry),
            ) else {
                continue;
            };

            let body = json!({ "operation": entry_id });
            match self.patch(resource::FLOWS, flow_id, &flow.name, &body).await {
                Ok(()) => report.applied(&flow.name, Some(flow_id.to_string())),
                Err(reason) => report.failed(&flow.name, reason),
            }
        }
        report
    }

    /// Target id for a source reference, falling back to the source id.
    fn rewrite_reference(&self, kind: EntityKind, source_id: &str, entity: &str) -> String {
        match self.registry.get(kind, source_id) {
            Some(target_id) => target_id.to_string(),
            None => {
                warn!(
                    entity,
                    kind = %kind,
                    reference = source_id,
                    "unresolved reference kept as source id"
                );
                source_id.to_string()
            }
        }
    }
}
