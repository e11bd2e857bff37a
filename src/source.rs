//! Instance state retrieval: live from the API or from snapshot files.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ApiError, RemoteApi, list_as, resource};
use crate::models::{Flow, InstanceState, Policy, Role, Snapshot};
use crate::{Error, Result};

/// Which side of a promotion an instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Source,
    Target,
}

impl InstanceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }

    /// File name of this instance's saved snapshot.
    pub fn snapshot_file(&self) -> &'static str {
        match self {
            Self::Source => "snapshot_source.json",
            Self::Target => "snapshot_target.json",
        }
    }

    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.snapshot_file())
    }
}

impl std::fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Live state of one instance plus the snapshot document as received.
#[derive(Debug, Clone)]
pub struct FetchedState {
    pub state: InstanceState,
    pub raw_snapshot: Value,
}

/// Read the snapshot and the role/policy/flow lists of one instance.
///
/// Any failure aborts with [`Error::Retrieval`]; nothing is retried.
pub async fn fetch_state(api: &dyn RemoteApi, role: InstanceRole) -> Result<FetchedState> {
    let retrieval = |source: ApiError| Error::Retrieval {
        instance: role.to_string(),
        source,
    };

    let (raw_snapshot, roles, policies, flows) = tokio::try_join!(
        api.snapshot(),
        list_as::<Role>(api, resource::ROLES),
        list_as::<Policy>(api, resource::POLICIES),
        list_as::<Flow>(api, resource::FLOWS),
    )
    .map_err(retrieval)?;

    let snapshot = Snapshot::from_value(raw_snapshot.clone())?;
    info!(instance = %role, summary = %snapshot.summary(), "instance state retrieved");
    Ok(FetchedState {
        state: InstanceState {
            snapshot,
            roles,
            policies,
            flows,
        },
        raw_snapshot,
    })
}

/// Fetch both instances concurrently.
pub async fn fetch_both(
    source: &dyn RemoteApi,
    target: &dyn RemoteApi,
) -> Result<(FetchedState, FetchedState)> {
    tokio::try_join!(
        fetch_state(source, InstanceRole::Source),
        fetch_state(target, InstanceRole::Target),
    )
}

/// Fetch the raw snapshot document of one instance.
pub async fn fetch_snapshot(api: &dyn RemoteApi, role: InstanceRole) -> Result<Value> {
    api.snapshot().await.map_err(|source| Error::Retrieval {
        instance: role.to_string(),
        source,
    })
}

/// Write a snapshot document as pretty-printed JSON.
pub fn save_snapshot(dir: &Path, role: InstanceRole, snapshot: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = role.snapshot_path(dir);
    fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
    debug!(path = %path.display(), "snapshot saved");
    Ok(path)
}

/// Load a previously saved snapshot.
pub fn load_snapshot(dir: &Path, role: InstanceRole) -> Result<Snapshot> {
    let path = role.snapshot_path(dir);
    if !path.exists() {
        return Err(Error::SnapshotNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidSnapshot(format!("{}: {}", path.display(), e)))?;
    Snapshot::from_value(value)
}

/// Instance states built from both snapshot files (no entity lists).
pub fn load_local_states(dir: &Path) -> Result<(InstanceState, InstanceState)> {
    Ok((
        InstanceState::from_snapshot(load_snapshot(dir, InstanceRole::Source)?),
        InstanceState::from_snapshot(load_snapshot(dir, InstanceRole::Target)?),
    ))
}
