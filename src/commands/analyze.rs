//! `promote analyze`: report what the target is missing.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use super::{Output, connect, field_filter, json_string};
use crate::config::Settings;
use crate::diff::{Diff, DiffSummary, SAMPLE_LIMIT, SystemFieldFilter};
use crate::models::{InstanceState, Keyed, SnapshotSummary};
use crate::source::{self, InstanceRole};
use crate::Result;

/// Where the compared states came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Both instances read from the API
    Live,
    /// Source schema read from the saved snapshot file
    Local,
}

/// Diff report of a source/target pair.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub mode: RunMode,
    pub source: SnapshotSummary,
    pub target: SnapshotSummary,
    pub collections: DiffSummary,
    pub fields: DiffSummary,
    /// Fields whose definition differs (diagnostic, never applied)
    pub updated_fields: Vec<String>,
    /// New reserved-namespace fields left out by the marker filter
    pub ignored_system_fields: usize,
    /// Markers of the active system-field filter; `None` when disabled
    pub system_field_markers: Option<Vec<String>>,
    pub relations: DiffSummary,
    pub roles: DiffSummary,
    pub policies: DiffSummary,
    pub flows: DiffSummary,
    /// Whether role/policy/flow lists were read (live mode only)
    pub access_control_compared: bool,
    pub pending_changes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub saved_snapshots: Vec<PathBuf>,
}

impl Analysis {
    pub fn new(
        mode: RunMode,
        source: &InstanceState,
        target: &InstanceState,
        diff: &Diff,
        filter: &SystemFieldFilter,
        access_control_compared: bool,
    ) -> Self {
        let mut relations = diff.relations.summary();
        relations.samples = diff.relation_samples();

        Self {
            mode,
            source: source.snapshot.summary(),
            target: target.snapshot.summary(),
            collections: diff.collections.summary(),
            fields: diff.fields.summary(),
            updated_fields: diff
                .fields
                .updated
                .iter()
                .take(SAMPLE_LIMIT)
                .map(Keyed::key)
                .collect(),
            ignored_system_fields: diff.ignored_system_fields,
            system_field_markers: filter.is_enabled().then(|| filter.markers().to_vec()),
            relations,
            roles: diff.roles.summary(),
            policies: diff.policies.summary(),
            flows: diff.flows.summary(),
            access_control_compared,
            pending_changes: diff.pending_changes(),
            saved_snapshots: Vec::new(),
        }
    }

    fn write_section(out: &mut String, title: &str, summary: &DiffSummary) {
        let _ = writeln!(out, "{}: {} new", title, summary.new);
        for sample in &summary.samples {
            let _ = writeln!(out, "  + {}", sample);
        }
        if summary.new > summary.samples.len() {
            let _ = writeln!(out, "  ... and {} more", summary.new - summary.samples.len());
        }
    }
}

impl Output for Analysis {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Source: {}", self.source);
        let _ = writeln!(out, "Target: {}", self.target);
        out.push('\n');

        Self::write_section(&mut out, "Collections", &self.collections);
        Self::write_section(&mut out, "Fields", &self.fields);
        if self.fields.updated > 0 {
            let _ = writeln!(
                out,
                "  {} field(s) differ on the target (not applied):",
                self.fields.updated
            );
            for key in &self.updated_fields {
                let _ = writeln!(out, "  ~ {}", key);
            }
        }
        match &self.system_field_markers {
            Some(markers) if self.ignored_system_fields > 0 => {
                let _ = writeln!(
                    out,
                    "  {} standard system field(s) ignored (kept markers: {})",
                    self.ignored_system_fields,
                    markers.join(", ")
                );
            }
            Some(_) => {}
            None => out.push_str("  System-field filter disabled\n"),
        }
        Self::write_section(&mut out, "Relations", &self.relations);

        if self.access_control_compared {
            Self::write_section(&mut out, "Roles", &self.roles);
            Self::write_section(&mut out, "Policies", &self.policies);
            Self::write_section(&mut out, "Flows", &self.flows);
        } else {
            out.push_str("Roles, policies and flows: not compared (local snapshot mode)\n");
        }

        out.push('\n');
        if self.pending_changes == 0 {
            out.push_str("Target is up to date.");
        } else {
            let _ = write!(out, "Pending changes: {}", self.pending_changes);
        }
        for path in &self.saved_snapshots {
            let _ = write!(out, "\nSaved {}", path.display());
        }
        out
    }
}

/// Compare source and target without changing anything.
///
/// Live mode reads both instances and saves their snapshots; local mode
/// compares the saved snapshot files and needs no connection settings.
pub async fn analyze(
    settings: &Settings,
    local: bool,
    all_system_fields: bool,
) -> Result<Analysis> {
    let filter = field_filter(settings, all_system_fields);
    let snapshot_dir = &settings.snapshot_dir.value;

    if local {
        let (source, target) = source::load_local_states(snapshot_dir)?;
        let diff = Diff::compute(&source, &target, &filter);
        info!(pending = diff.pending_changes(), "local analysis done");
        return Ok(Analysis::new(RunMode::Local, &source, &target, &diff, &filter, false));
    }

    settings.require(true, true)?;
    let source_api = connect(settings, InstanceRole::Source)?;
    let target_api = connect(settings, InstanceRole::Target)?;
    let (source, target) = source::fetch_both(&source_api, &target_api).await?;

    let saved = vec![
        source::save_snapshot(snapshot_dir, InstanceRole::Source, &source.raw_snapshot)?,
        source::save_snapshot(snapshot_dir, InstanceRole::Target, &target.raw_snapshot)?,
    ];

    let diff = Diff::compute(&source.state, &target.state, &filter);
    info!(pending = diff.pending_changes(), "live analysis done");
    let mut analysis = Analysis::new(
        RunMode::Live,
        &source.state,
        &target.state,
        &diff,
        &filter,
        true,
    );
    analysis.saved_snapshots = saved;
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::settings_with_env;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_snapshots(dir: &std::path::Path) {
        let source = json!({ "data": {
            "collections": [{ "collection": "A" }],
            "fields": [
                { "collection": "A", "field": "x", "type": "string" },
                { "collection": "directus_users", "field": "tenant_id", "type": "uuid" },
                { "collection": "directus_users", "field": "theme", "type": "string" }
            ],
            "relations": [
                { "collection": "A", "field": "owner", "related_collection": "directus_users" }
            ]
        }});
        let target = json!({ "data": {} });
        source::save_snapshot(dir, InstanceRole::Source, &source).unwrap();
        source::save_snapshot(dir, InstanceRole::Target, &target).unwrap();
    }

    #[tokio::test]
    async fn test_local_analysis_needs_no_connection_settings() {
        let dir = TempDir::new().unwrap();
        write_snapshots(dir.path());
        let settings = settings_with_env(dir.path(), &[]);

        let analysis = analyze(&settings, true, false).await.unwrap();
        assert_eq!(analysis.mode, RunMode::Local);
        assert_eq!(analysis.collections.samples, vec!["A"]);
        assert_eq!(analysis.fields.new, 2);
        assert_eq!(analysis.ignored_system_fields, 1);
        assert_eq!(analysis.relations.samples, vec!["A.owner -> directus_users"]);
        assert_eq!(analysis.pending_changes, 4);
        assert!(!analysis.access_control_compared);
    }

    #[tokio::test]
    async fn test_all_system_fields_disables_filter() {
        let dir = TempDir::new().unwrap();
        write_snapshots(dir.path());
        let settings = settings_with_env(dir.path(), &[]);

        let analysis = analyze(&settings, true, true).await.unwrap();
        assert_eq!(analysis.fields.new, 3);
        assert_eq!(analysis.ignored_system_fields, 0);
        assert_eq!(analysis.system_field_markers, None);
        assert!(analysis.to_human().contains("System-field filter disabled"));
    }

    #[tokio::test]
    async fn test_local_analysis_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let settings = settings_with_env(dir.path(), &[]);
        let err = analyze(&settings, true, false).await.unwrap_err();
        assert!(matches!(err, crate::Error::SnapshotNotFound(_)));
    }

    #[tokio::test]
    async fn test_live_analysis_reports_missing_variables() {
        let dir = TempDir::new().unwrap();
        let settings = settings_with_env(dir.path(), &[]);
        let err = analyze(&settings, false, false).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing configuration: DEV_URL, DEV_TOKEN, PROD_URL, PROD_TOKEN"
        );
    }

    #[tokio::test]
    async fn test_human_output() {
        let dir = TempDir::new().unwrap();
        write_snapshots(dir.path());
        let settings = settings_with_env(dir.path(), &[]);

        let human = analyze(&settings, true, false).await.unwrap().to_human();
        assert!(human.contains("Collections: 1 new"));
        assert!(human.contains("  + A.x"));
        assert!(human.contains(
            "1 standard system field(s) ignored (kept markers: tenant, custom_, app_)"
        ));
        assert!(human.contains("not compared (local snapshot mode)"));
        assert!(human.ends_with("Pending changes: 4"));
    }
}
