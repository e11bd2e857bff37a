//! Promote CLI - schema and access-control promotion from development to production.

use clap::Parser;
use promote::cli::{Cli, Commands, ConfigCommands};
use promote::commands::{self, ApplyOptions, Output};
use promote::config::{self, ConfigOverrides};
use promote::{gate, logging};
use std::env;
use std::process;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // --verbose or DEBUG=true turns on debug logging
    let verbose =
        cli.verbose || logging::debug_from_env(env::var(logging::DEBUG_ENV).ok().as_deref());
    let _guard = match logging::init(verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            print_error(&e, human);
            process::exit(1);
        }
    };

    let overrides = build_overrides(&cli);
    let result = run_command(cli.command, &overrides, human);

    if let Err(e) = result {
        print_error(&e, human);
        process::exit(1);
    }
}

fn print_error(e: &promote::Error, human: bool) {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
}

/// Collect the CLI flags that take precedence over files and environment.
fn build_overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(path) = &cli.config_path {
        overrides = overrides.with_config_path(path);
    }
    if let Some(url) = &cli.source_url {
        overrides = overrides.with_source_url(url);
    }
    if let Some(url) = &cli.target_url {
        overrides = overrides.with_target_url(url);
    }
    if let Some(dir) = &cli.snapshot_dir {
        overrides = overrides.with_snapshot_dir(dir);
    }
    if let Commands::Apply {
        delay_secs: Some(secs),
        ..
    } = &cli.command
    {
        overrides = overrides.with_gate_delay_secs(*secs);
    }
    overrides
}

fn run_command(
    command: Commands,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), promote::Error> {
    let settings = config::resolve_settings(overrides)?;

    match command {
        Commands::Analyze {
            local,
            all_system_fields,
        } => {
            let result = block_on(commands::analyze(&settings, local, all_system_fields))?;
            output(&result, human);
        }
        Commands::Apply {
            local,
            dry_run,
            all_system_fields,
            ..
        } => {
            let options = ApplyOptions {
                local,
                dry_run,
                all_system_fields,
            };
            let result = block_on(commands::apply(&settings, options, gate::interrupt()))?;
            output(&result, human);
        }
        Commands::Snapshot => {
            let result = block_on(commands::snapshot(&settings))?;
            output(&result, human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(&settings);
                output(&result, human);
            }
        },
    }

    Ok(())
}

/// Run a command future on a fresh multi-threaded runtime.
fn block_on<T>(
    future: impl std::future::Future<Output = Result<T, promote::Error>>,
) -> Result<T, promote::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| promote::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(future)
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
