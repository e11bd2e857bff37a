//! Common test utilities for promote integration tests.
//!
//! Provides `TestEnv` for isolated runs that never read the user's config
//! files or environment and write snapshots into a temporary directory.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Variables that would leak settings from the developer's shell.
const INHERITED_VARS: &[&str] = &[
    "DEV_URL",
    "DEV_TOKEN",
    "PROD_URL",
    "PROD_TOKEN",
    "PROMOTE_CONFIG",
    "PROMOTE_SNAPSHOT_DIR",
    "DEBUG",
    "DRY_RUN",
    "RUST_LOG",
];

/// A test environment with an isolated working directory and home.
///
/// The `promote()` method returns a `Command` running in `work_dir` with
/// `HOME`/`XDG_CONFIG_HOME` pointed at `home_dir`, so no system config file
/// is picked up.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the promote binary with a clean environment.
    pub fn promote(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_promote"));
        cmd.current_dir(self.work_dir.path());
        for var in INHERITED_VARS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.home_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"));
        cmd
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Write a snapshot file as `promote snapshot` would.
    pub fn write_snapshot(&self, name: &str, document: &Value) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
        path
    }

    /// Source snapshot with one collection, two fields and a relation;
    /// empty target snapshot.
    pub fn write_sample_snapshots(&self) {
        self.write_snapshot("snapshot_source.json", &sample_source_snapshot());
        self.write_snapshot("snapshot_target.json", &json!({ "data": {} }));
    }

    /// Write `promote.toml` in the working directory.
    pub fn write_session_config(&self, content: &str) {
        fs::write(self.path().join("promote.toml"), content).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot document of a small development instance.
pub fn sample_source_snapshot() -> Value {
    json!({ "data": {
        "version": 1,
        "collections": [
            {
                "collection": "articles",
                "meta": { "icon": "article" },
                "schema": { "name": "articles" }
            }
        ],
        "fields": [
            { "collection": "articles", "field": "title", "type": "string" },
            { "collection": "articles", "field": "author", "type": "uuid" }
        ],
        "relations": [
            { "collection": "articles", "field": "author", "related_collection": "directus_users" }
        ]
    }})
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}
