//! Promote - schema and access-control promotion between platform instances.
//!
//! This library provides the core functionality for the `promote` CLI tool:
//! snapshot retrieval, diffing a development (source) instance against a
//! production (target) instance, and the dependency-ordered reconciliation
//! that creates whatever the target is missing.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod diff;
pub mod gate;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod source;

use std::path::PathBuf;

use client::ApiError;


/// Library-level error type for promotion runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not read {instance} instance: {source}")]
    Retrieval {
        instance: String,
        #[source]
        source: ApiError,
    },

    #[error("Snapshot file not found: {} (run `promote snapshot` first)", .0.display())]
    SnapshotNotFound(PathBuf),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Cancelled before any change was applied")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for promotion operations.
pub type Result<T> = std::result::Result<T, Error>;
