//! TOML schema for `promote.toml` / `config.toml`.
//!
//! ```toml
//! snapshot_dir = "snapshots"
//! gate_delay_secs = 5
//! system_field_markers = ["tenant", "custom_", "app_"]
//!
//! [source]
//! url = "https://dev.example.com"
//! token = "..."
//!
//! [target]
//! url = "https://cms.example.com"
//! token = "..."
//! ```
//!
//! Every key is optional; missing values fall through to lower-precedence
//! sources.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Session config file looked up in the working directory.
pub const SESSION_CONFIG_FILE: &str = "promote.toml";

/// Connection settings of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Base URL of the management API
    pub url: Option<String>,

    /// Static bearer token
    pub token: Option<String>,
}

/// Contents of one config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Development instance
    #[serde(default)]
    pub source: InstanceConfig,

    /// Production instance
    #[serde(default)]
    pub target: InstanceConfig,

    /// Directory holding `snapshot_source.json` / `snapshot_target.json`
    pub snapshot_dir: Option<PathBuf>,

    /// Confirmation gate wait in seconds (0 disables the wait)
    pub gate_delay_secs: Option<u64>,

    /// Substrings that opt reserved-namespace fields into promotion
    pub system_field_markers: Option<Vec<String>>,
}

impl ConfigFile {
    /// Parse a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path`, returning `None` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map(Some)
    }
}

/// Location of the system config file (`~/.config/promote/config.toml`).
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("promote").join("config.toml"))
}
