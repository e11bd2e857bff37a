//! CLI argument definitions for promote.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PROMOTE_GIT_COMMIT"),
    " ",
    env!("PROMOTE_BUILD_TIMESTAMP"),
    ")"
);

/// Promote - copy schema and access control from development to production.
///
/// Recommended workflow:
///
///   1. promote snapshot          # save both instances' schema snapshots
///   2. promote analyze --local   # review what would be created, offline
///   3. promote apply --dry-run   # re-check against the live instances
///   4. promote apply             # create missing entities (Ctrl+C to abort)
///
/// The production instance is only ever extended: existing entities are
/// never modified or deleted. Connection settings come from DEV_URL,
/// DEV_TOKEN, PROD_URL and PROD_TOKEN, or from promote.toml.
#[derive(Parser, Debug)]
#[command(name = "promote")]
#[command(author, version, long_version = LONG_VERSION)]
#[command(about = "Promote schema and access control from a development instance to production")]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Enable debug logging (also enabled by DEBUG=true)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Session config file (defaults to ./promote.toml).
    /// Can also be set via PROMOTE_CONFIG environment variable.
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Source (development) instance URL, overrides DEV_URL
    #[arg(long, global = true, value_name = "URL")]
    pub source_url: Option<String>,

    /// Target (production) instance URL, overrides PROD_URL
    #[arg(long, global = true, value_name = "URL")]
    pub target_url: Option<String>,

    /// Directory for snapshot_source.json / snapshot_target.json,
    /// overrides PROMOTE_SNAPSHOT_DIR
    #[arg(long, global = true, value_name = "DIR")]
    pub snapshot_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare source and target and report what is missing (no changes)
    ///
    /// Live mode reads both instances and saves their snapshots. With
    /// --local the saved snapshot files are compared instead; roles,
    /// policies and flows are then not compared.
    Analyze {
        /// Compare the saved snapshot files instead of the live instances
        #[arg(long)]
        local: bool,

        /// Include every new reserved-namespace field, not only marked ones
        #[arg(long)]
        all_system_fields: bool,
    },

    /// Create everything the target is missing, in dependency order
    ///
    /// Announces the pending change count and waits before the first
    /// change; press Ctrl+C during the wait to abort without changes.
    Apply {
        /// Take the source schema from the saved snapshot files.
        /// Only the target needs to be reachable; operations and
        /// permissions are skipped.
        #[arg(long)]
        local: bool,

        /// Report what would be created and stop (also set by DRY_RUN=true)
        #[arg(long, env = "DRY_RUN")]
        dry_run: bool,

        /// Seconds to wait before applying (0 applies immediately)
        #[arg(long, value_name = "SECS")]
        delay_secs: Option<u64>,

        /// Include every new reserved-namespace field, not only marked ones
        #[arg(long)]
        all_system_fields: bool,
    },

    /// Fetch and save both instances' schema snapshots
    Snapshot,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each value came from (tokens masked)
    Show,
}
