//! `promote apply`: diff, confirmation gate, reconciliation.

use std::fmt::Write as _;
use std::future::Future;

use serde::Serialize;
use tracing::info;

use super::analyze::{Analysis, RunMode, analyze};
use super::{Output, connect, field_filter, json_string};
use crate::client::RemoteApi;
use crate::config::Settings;
use crate::diff::Diff;
use crate::gate::{ConfirmationGate, GateDecision};
use crate::models::InstanceState;
use crate::reconcile::{ApplyReport, Phase, PhaseReport, Reconciler};
use crate::source::{self, InstanceRole};
use crate::{Error, Result};

/// Flags of one apply run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Take the source schema from the saved snapshot file
    pub local: bool,
    /// Stop after the analysis
    pub dry_run: bool,
    /// Disable the reserved-namespace marker filter
    pub all_system_fields: bool,
}

/// Succeeded/failed counts of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTotal {
    pub phase: Phase,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl From<&PhaseReport> for PhaseTotal {
    fn from(report: &PhaseReport) -> Self {
        Self {
            phase: report.phase,
            succeeded: report.succeeded(),
            failed: report.failed_count(),
            skipped: report.skipped.clone(),
        }
    }
}

/// Outcome of `promote apply`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub analysis: Analysis,
    /// Per-phase totals; empty when nothing was applied
    pub totals: Vec<PhaseTotal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ApplyReport>,
}

impl ApplyResult {
    fn not_applied(dry_run: bool, analysis: Analysis) -> Self {
        Self {
            dry_run,
            analysis,
            totals: Vec::new(),
            report: None,
        }
    }

    fn applied(analysis: Analysis, report: ApplyReport) -> Self {
        Self {
            dry_run: false,
            analysis,
            totals: report.phases.iter().map(PhaseTotal::from).collect(),
            report: Some(report),
        }
    }
}

impl Output for ApplyResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = self.analysis.to_human();
        let Some(report) = &self.report else {
            if self.dry_run {
                out.push_str("\n\nDry run: no changes applied.");
            }
            return out;
        };

        out.push_str("\n\n");
        for phase in &report.phases {
            if let Some(reason) = &phase.skipped {
                let _ = writeln!(out, "{}: skipped ({})", phase.phase, reason);
                continue;
            }
            let _ = write!(out, "{} {}: {}", phase.phase, phase.phase.verb(), phase.succeeded());
            if phase.failed_count() > 0 {
                let _ = write!(out, " ({} failed)", phase.failed_count());
            }
            out.push('\n');

            if phase.phase == Phase::Fields {
                for tally in report.field_tally() {
                    let _ = writeln!(
                        out,
                        "  {}: {} created, {} failed",
                        tally.group, tally.succeeded, tally.failed
                    );
                }
            }
            for (entity, reason) in phase.failures() {
                let _ = writeln!(out, "  x {}: {}", entity, reason);
            }
        }
        let _ = write!(
            out,
            "\nDone: {} succeeded, {} failed",
            report.total_succeeded(),
            report.total_failed()
        );
        out
    }
}

/// Apply missing entities to the target.
///
/// `cancel` aborts the run while the confirmation gate is open; after the
/// gate it is no longer observed.
pub async fn apply<F>(settings: &Settings, options: ApplyOptions, cancel: F) -> Result<ApplyResult>
where
    F: Future<Output = ()>,
{
    if options.dry_run {
        let analysis = analyze(settings, options.local, options.all_system_fields).await?;
        return Ok(ApplyResult::not_applied(true, analysis));
    }

    settings.require(!options.local, true)?;
    let snapshot_dir = &settings.snapshot_dir.value;
    let target_api = connect(settings, InstanceRole::Target)?;
    let source_api = if options.local {
        None
    } else {
        Some(connect(settings, InstanceRole::Source)?)
    };

    let (source, target, mut saved) = match &source_api {
        Some(source_api) => {
            let (source, target) = source::fetch_both(source_api, &target_api).await?;
            let saved = vec![
                source::save_snapshot(snapshot_dir, InstanceRole::Source, &source.raw_snapshot)?,
                source::save_snapshot(snapshot_dir, InstanceRole::Target, &target.raw_snapshot)?,
            ];
            (source.state, target.state, saved)
        }
        None => {
            let snapshot = source::load_snapshot(snapshot_dir, InstanceRole::Source)?;
            let target = source::fetch_state(&target_api, InstanceRole::Target).await?;
            let saved = vec![source::save_snapshot(
                snapshot_dir,
                InstanceRole::Target,
                &target.raw_snapshot,
            )?];
            (InstanceState::from_snapshot(snapshot), target.state, saved)
        }
    };

    let filter = field_filter(settings, options.all_system_fields);
    let diff = Diff::compute(&source, &target, &filter);
    let mode = if options.local { RunMode::Local } else { RunMode::Live };
    let mut analysis = Analysis::new(mode, &source, &target, &diff, &filter, !options.local);
    analysis.saved_snapshots.append(&mut saved);

    let pending = diff.pending_changes();
    if pending == 0 {
        info!("target is up to date, nothing to apply");
        return Ok(ApplyResult::not_applied(false, analysis));
    }

    let gate = ConfirmationGate::new(settings.gate_delay.value);
    if !gate.delay().is_zero() {
        eprintln!(
            "Applying {} change(s) to {} in {}s. Press Ctrl+C to abort.",
            pending,
            target_api.base_url(),
            gate.delay().as_secs()
        );
    }
    if gate.wait(pending, cancel).await == GateDecision::Cancelled {
        return Err(Error::Cancelled);
    }

    let source_ref = source_api.as_ref().map(|api| api as &dyn RemoteApi);
    let mut reconciler = Reconciler::new(source_ref, &target_api);
    let report = reconciler.run(&diff, &source, &target).await;
    Ok(ApplyResult::applied(analysis, report))
}
