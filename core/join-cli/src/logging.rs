//! Log setup for the CLI.
//!
//! Stdout belongs to the user-facing status lines, so diagnostics go to a
//! daily-rolling file under `~/.bambinos/logs/`. When that directory cannot
//! be created, logs fall back to stderr.

use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "bambinos-join.log";
const LOG_FILTER_ENV: &str = "BAMBINOS_LOG";
const DEBUG_ENV: &str = "BAMBINOS_DEBUG_LOG";

/// Installs the global subscriber. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init() -> Option<WorkerGuard> {
    let filter = build_filter();

    match log_dir().filter(|dir| fs_err::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn build_filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".bambinos").join("logs"))
}
