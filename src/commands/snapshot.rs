//! `promote snapshot`: fetch and persist both schema snapshots.

use std::path::PathBuf;

use serde::Serialize;

use super::{Output, connect, json_string};
use crate::config::Settings;
use crate::models::{Snapshot, SnapshotSummary};
use crate::source::{self, InstanceRole};
use crate::Result;

/// One persisted snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SavedSnapshot {
    pub path: PathBuf,
    pub summary: SnapshotSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResult {
    pub source: SavedSnapshot,
    pub target: SavedSnapshot,
}

impl Output for SnapshotResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Source: {}\n  saved to {}\nTarget: {}\n  saved to {}",
            self.source.summary,
            self.source.path.display(),
            self.target.summary,
            self.target.path.display()
        )
    }
}

/// Fetch both snapshots concurrently and write them to the snapshot directory.
pub async fn snapshot(settings: &Settings) -> Result<SnapshotResult> {
    settings.require(true, true)?;
    let source_api = connect(settings, InstanceRole::Source)?;
    let target_api = connect(settings, InstanceRole::Target)?;

    let (source_raw, target_raw) = tokio::try_join!(
        source::fetch_snapshot(&source_api, InstanceRole::Source),
        source::fetch_snapshot(&target_api, InstanceRole::Target),
    )?;

    let dir = &settings.snapshot_dir.value;
    Ok(SnapshotResult {
        source: save(dir, InstanceRole::Source, source_raw)?,
        target: save(dir, InstanceRole::Target, target_raw)?,
    })
}

fn save(
    dir: &std::path::Path,
    role: InstanceRole,
    raw: serde_json::Value,
) -> Result<SavedSnapshot> {
    let path = source::save_snapshot(dir, role, &raw)?;
    let summary = Snapshot::from_value(raw)?.summary();
    Ok(SavedSnapshot { path, summary })
}
