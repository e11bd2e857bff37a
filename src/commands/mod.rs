//! Command implementations for the promote CLI.
//!
//! This module contains the business logic for each CLI command:
//! - `analyze` - Diff source against target, no mutation
//! - `apply` - Diff, confirmation gate, reconciliation
//! - `snapshot` - Fetch and persist both schema snapshots
//! - `config` - Show resolved settings
//!
//! Every command returns a value implementing [`Output`]; `main` prints it as
//! JSON (default) or human-readable text.

mod analyze;
mod apply;
mod config;
mod snapshot;

pub use analyze::{Analysis, RunMode, analyze};
pub use apply::{ApplyOptions, ApplyResult, PhaseTotal, apply};
pub use config::{ConfigShow, SettingView, config_show};
pub use snapshot::{SavedSnapshot, SnapshotResult, snapshot};

use serde::Serialize;

use crate::client::HttpClient;
use crate::config::{DEV_TOKEN_ENV, DEV_URL_ENV, PROD_TOKEN_ENV, PROD_URL_ENV, Settings};
use crate::diff::SystemFieldFilter;
use crate::source::InstanceRole;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Compact JSON for any serializable result.
pub(crate) fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// HTTP client for one instance from resolved settings.
pub(crate) fn connect(settings: &Settings, role: InstanceRole) -> Result<HttpClient> {
    let (instance, url_var, token_var) = match role {
        InstanceRole::Source => (&settings.source, DEV_URL_ENV, DEV_TOKEN_ENV),
        InstanceRole::Target => (&settings.target, PROD_URL_ENV, PROD_TOKEN_ENV),
    };
    let (Some(url), Some(token)) = (instance.url(), instance.token()) else {
        return Err(Error::MissingConfig(vec![
            url_var.to_string(),
            token_var.to_string(),
        ]));
    };
    Ok(HttpClient::new(url, token)?)
}

/// Reserved-namespace field filter for a run.
pub(crate) fn field_filter(settings: &Settings, all_system_fields: bool) -> SystemFieldFilter {
    if all_system_fields {
        SystemFieldFilter::disabled()
    } else {
        SystemFieldFilter::new(settings.system_field_markers.value.clone())
    }
}
