//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays reserved for command output (JSON by
//! default). The default level is `warn`; verbose mode raises it to `debug`
//! and `RUST_LOG` overrides both. An optional log file receives the same
//! events without ANSI colors.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Environment variable that enables verbose logging when set to `true`.
pub const DEBUG_ENV: &str = "DEBUG";

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Whether `DEBUG` asks for verbose logging.
pub fn debug_from_env(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be kept
/// alive for the whole run.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .map_err(|e| Error::InvalidConfig(format!("invalid log filter: {}", e)))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().ok_or_else(|| {
                Error::InvalidConfig(format!("invalid log file path: {}", path.display()))
            })?;
            std::fs::create_dir_all(directory)?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to initialize logging: {}", e)))?;

    Ok(guard)
}
