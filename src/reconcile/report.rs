//! Structured outcomes of a reconciliation pass.
//!
//! Every create/patch call yields one [`EntityOutcome`]; outcomes are grouped
//! per [`Phase`] and the phases make up the [`ApplyReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::IdMapping;

/// Steps of the dependency-ordered apply, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Collections,
    Fields,
    Relations,
    Roles,
    Policies,
    Flows,
    Operations,
    OperationLinks,
    FlowLinks,
    Permissions,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 10] = [
        Phase::Collections,
        Phase::Fields,
        Phase::Relations,
        Phase::Roles,
        Phase::Policies,
        Phase::Flows,
        Phase::Operations,
        Phase::OperationLinks,
        Phase::FlowLinks,
        Phase::Permissions,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Phase::Collections => "Collections",
            Phase::Fields => "Fields",
            Phase::Relations => "Relations",
            Phase::Roles => "Roles",
            Phase::Policies => "Policies",
            Phase::Flows => "Flows",
            Phase::Operations => "Operations",
            Phase::OperationLinks => "Operation links",
            Phase::FlowLinks => "Flow entry links",
            Phase::Permissions => "Permissions",
        }
    }

    /// Whether the phase patches existing items instead of creating new ones.
    pub fn is_link_pass(&self) -> bool {
        matches!(self, Phase::OperationLinks | Phase::FlowLinks)
    }

    /// Verb used in summaries.
    pub fn verb(&self) -> &'static str {
        if self.is_link_pass() {
            "updated"
        } else {
            "created"
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Result of one create/patch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied {
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// Outcome for one identified entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    /// Identity of the entity (e.g., `articles.title`, `Editors`)
    pub entity: String,

    /// Grouping key for tallies (owning collection for fields)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Outcomes of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,

    pub outcomes: Vec<EntityOutcome>,

    /// Why the phase did not run at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
            skipped: None,
        }
    }

    pub fn skipped(phase: Phase, reason: impl Into<String>) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
            skipped: Some(reason.into()),
        }
    }

    pub fn applied(&mut self, entity: impl Into<String>, target_id: Option<String>) {
        self.push(entity.into(), None, Outcome::Applied { target_id });
    }

    pub fn failed(&mut self, entity: impl Into<String>, reason: impl Into<String>) {
        self.push(
            entity.into(),
            None,
            Outcome::Failed {
                reason: reason.into(),
            },
        );
    }

    /// Record an outcome under a tally group.
    pub fn record_in_group(
        &mut self,
        entity: impl Into<String>,
        group: impl Into<String>,
        outcome: Outcome,
    ) {
        self.push(entity.into(), Some(group.into()), outcome);
    }

    fn push(&mut self, entity: String, group: Option<String>, outcome: Outcome) {
        self.outcomes.push(EntityOutcome {
            entity,
            group,
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_applied()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed { reason } => Some((o.entity.as_str(), reason.as_str())),
            Outcome::Applied { .. } => None,
        })
    }

    /// Entities in attempt order.
    pub fn entities(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.entity.as_str()).collect()
    }
}

/// Succeeded/failed counts of one group (fields per owning collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTally {
    pub group: String,
    pub succeeded: usize,
    pub failed: usize,
}

/// Aggregated result of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phases: Vec<PhaseReport>,
    /// Source-to-target identifiers recorded during the pass
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_mappings: Vec<IdMapping>,
}

impl ApplyReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Entities successfully created (or linked) in `phase`.
    pub fn created(&self, phase: Phase) -> usize {
        self.phase(phase).map_or(0, PhaseReport::succeeded)
    }

    pub fn total_succeeded(&self) -> usize {
        self.phases.iter().map(PhaseReport::succeeded).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.phases.iter().map(PhaseReport::failed_count).sum()
    }

    /// Per-collection tally of the fields phase, in attempt order.
    pub fn field_tally(&self) -> Vec<GroupTally> {
        let mut tally: Vec<GroupTally> = Vec::new();
        let Some(fields) = self.phase(Phase::Fields) else {
            return tally;
        };
        for outcome in &fields.outcomes {
            let Some(group) = &outcome.group else {
                continue;
            };
            let index = match tally.iter().position(|t| &t.group == group) {
                Some(index) => index,
                None => {
                    tally.push(GroupTally {
                        group: group.clone(),
                        succeeded: 0,
                        failed: 0,
                    });
                    tally.len() - 1
                }
            };
            if outcome.outcome.is_applied() {
                tally[index].succeeded += 1;
            } else {
                tally[index].failed += 1;
            }
        }
        tally
    }
}
