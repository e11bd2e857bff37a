//! Precedence resolution for run settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`DEV_URL`, `DEV_TOKEN`, `PROD_URL`, `PROD_TOKEN`,
//!    `PROMOTE_SNAPSHOT_DIR`)
//! 3. Session config file (`./promote.toml`, or `--config` / `PROMOTE_CONFIG`)
//! 4. System config file (`~/.config/promote/config.toml`)
//! 5. Built-in defaults
//!
//! Tokens are never accepted as CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema::{ConfigFile, InstanceConfig, SESSION_CONFIG_FILE, system_config_path};
use crate::diff::DEFAULT_MARKERS;
use crate::gate::DEFAULT_DELAY;
use crate::{Error, Result};

pub const DEV_URL_ENV: &str = "DEV_URL";
pub const DEV_TOKEN_ENV: &str = "DEV_TOKEN";
pub const PROD_URL_ENV: &str = "PROD_URL";
pub const PROD_TOKEN_ENV: &str = "PROD_TOKEN";
pub const SNAPSHOT_DIR_ENV: &str = "PROMOTE_SNAPSHOT_DIR";
pub const CONFIG_ENV: &str = "PROMOTE_CONFIG";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the session config file
    Session,
    /// Value from the system config file
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Mask a secret for display: first and last four characters only.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Resolved connection settings of one instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceSettings {
    pub url: Option<Resolved<String>>,
    pub token: Option<Resolved<String>>,
}

impl InstanceSettings {
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|r| r.value.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|r| r.value.as_str())
    }

    /// Get the masked token for display purposes.
    pub fn masked_token(&self) -> Option<String> {
        self.token().map(mask_token)
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit session config file
    pub config_path: Option<PathBuf>,
    pub source_url: Option<String>,
    pub target_url: Option<String>,
    pub snapshot_dir: Option<PathBuf>,
    pub gate_delay_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn with_gate_delay_secs(mut self, secs: u64) -> Self {
        self.gate_delay_secs = Some(secs);
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: InstanceSettings,
    pub target: InstanceSettings,
    pub snapshot_dir: Resolved<PathBuf>,
    pub gate_delay: Resolved<Duration>,
    pub system_field_markers: Resolved<Vec<String>>,
    /// Config files that were found and read, highest precedence first
    pub loaded_files: Vec<PathBuf>,
}

impl Settings {
    /// Check that URL and token are present for each required instance.
    ///
    /// Every missing variable is reported at once.
    pub fn require(&self, source: bool, target: bool) -> Result<()> {
        let mut missing = Vec::new();
        let mut required = Vec::new();
        if source {
            required.push((&self.source, DEV_URL_ENV, DEV_TOKEN_ENV));
        }
        if target {
            required.push((&self.target, PROD_URL_ENV, PROD_TOKEN_ENV));
        }

        let mut invalid = None;
        for (instance, url_var, token_var) in required {
            match instance.url() {
                None => missing.push(url_var.to_string()),
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    invalid.get_or_insert(format!(
                        "{} must be an http(s) URL, got {}",
                        url_var, url
                    ));
                }
                Some(_) => {}
            }
            if instance.token().is_none() {
                missing.push(token_var.to_string());
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }
        match invalid {
            Some(message) => Err(Error::InvalidConfig(message)),
            None => Ok(()),
        }
    }
}

/// First present candidate, tagged with its source.
fn first_of<T>(candidates: Vec<(Option<T>, ValueSource)>) -> Option<Resolved<T>> {
    candidates
        .into_iter()
        .find_map(|(value, source)| value.map(|v| Resolved::new(v, source)))
}

fn resolve_instance(
    cli_url: Option<&String>,
    env: &dyn Fn(&str) -> Option<String>,
    (url_var, token_var): (&str, &str),
    session: &InstanceConfig,
    system: &InstanceConfig,
) -> InstanceSettings {
    InstanceSettings {
        url: first_of(vec![
            (cli_url.cloned(), ValueSource::CliFlag),
            (env(url_var), ValueSource::EnvVar(url_var.to_string())),
            (session.url.clone(), ValueSource::Session),
            (system.url.clone(), ValueSource::System),
        ]),
        token: first_of(vec![
            (env(token_var), ValueSource::EnvVar(token_var.to_string())),
            (session.token.clone(), ValueSource::Session),
            (system.token.clone(), ValueSource::System),
        ]),
    }
}

/// Resolve settings from the process environment and the usual config files.
pub fn resolve_settings(overrides: &ConfigOverrides) -> Result<Settings> {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let explicit = overrides
        .config_path
        .clone()
        .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
    if let Some(path) = &explicit {
        if !path.exists() {
            return Err(Error::InvalidConfig(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }
    let session_path = explicit.unwrap_or_else(|| PathBuf::from(SESSION_CONFIG_FILE));

    resolve_with(overrides, &env, &session_path, system_config_path().as_deref())
}

/// Resolve settings with an injected environment and explicit file locations.
pub fn resolve_with(
    overrides: &ConfigOverrides,
    env: &dyn Fn(&str) -> Option<String>,
    session_path: &Path,
    system_path: Option<&Path>,
) -> Result<Settings> {
    let mut loaded_files = Vec::new();

    let session = match ConfigFile::load(session_path)? {
        Some(config) => {
            loaded_files.push(session_path.to_path_buf());
            config
        }
        None => ConfigFile::default(),
    };
    let system = match system_path {
        Some(path) => match ConfigFile::load(path)? {
            Some(config) => {
                loaded_files.push(path.to_path_buf());
                config
            }
            None => ConfigFile::default(),
        },
        None => ConfigFile::default(),
    };

    let source = resolve_instance(
        overrides.source_url.as_ref(),
        env,
        (DEV_URL_ENV, DEV_TOKEN_ENV),
        &session.source,
        &system.source,
    );
    let target = resolve_instance(
        overrides.target_url.as_ref(),
        env,
        (PROD_URL_ENV, PROD_TOKEN_ENV),
        &session.target,
        &system.target,
    );

    let snapshot_dir = first_of(vec![
        (overrides.snapshot_dir.clone(), ValueSource::CliFlag),
        (
            env(SNAPSHOT_DIR_ENV).map(PathBuf::from),
            ValueSource::EnvVar(SNAPSHOT_DIR_ENV.to_string()),
        ),
        (session.snapshot_dir.clone(), ValueSource::Session),
        (system.snapshot_dir.clone(), ValueSource::System),
    ])
    .unwrap_or_else(|| Resolved::new(PathBuf::from("."), ValueSource::Default));

    let gate_delay = first_of(vec![
        (overrides.gate_delay_secs, ValueSource::CliFlag),
        (session.gate_delay_secs, ValueSource::Session),
        (system.gate_delay_secs, ValueSource::System),
    ])
    .map(|r| Resolved::new(Duration::from_secs(r.value), r.source))
    .unwrap_or_else(|| Resolved::new(DEFAULT_DELAY, ValueSource::Default));

    let system_field_markers = first_of(vec![
        (session.system_field_markers.clone(), ValueSource::Session),
        (system.system_field_markers.clone(), ValueSource::System),
    ])
    .unwrap_or_else(|| {
        Resolved::new(
            DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            ValueSource::Default,
        )
    });

    Ok(Settings {
        source,
        target,
        snapshot_dir,
        gate_delay,
        system_field_markers,
        loaded_files,
    })
}
