//! Configuration for promotion runs.
//!
//! Settings come from CLI flags, environment variables and two optional TOML
//! files:
//!
//! ## promote.toml - Session config
//!
//! Located in the working directory, or wherever `--config` /
//! `PROMOTE_CONFIG` points.
//!
//! ## config.toml - System config
//!
//! Located at `~/.config/promote/config.toml`.
//!
//! Both files share the schema in [`schema`]. Tokens are secrets: prefer the
//! `DEV_TOKEN` / `PROD_TOKEN` environment variables over committing them to a
//! session file.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_ENV, ConfigOverrides, DEV_TOKEN_ENV, DEV_URL_ENV, InstanceSettings, PROD_TOKEN_ENV,
    PROD_URL_ENV, Resolved, SNAPSHOT_DIR_ENV, Settings, ValueSource, mask_token, resolve_settings,
    resolve_with,
};
pub use schema::{ConfigFile, InstanceConfig, SESSION_CONFIG_FILE, system_config_path};
