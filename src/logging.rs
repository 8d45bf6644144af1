//! Tracing configuration and log routing.
//!
//! Logs go to stdout with a compact formatter and, when a log file can be
//! opened, to that file through a non-blocking writer. `FORMRAG_LOG_FILE`
//! overrides the default location of `logs/formrag.log`.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Keeps the non-blocking writer flushing for the process lifetime.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// `RUST_LOG` controls filtering and defaults to `info`. File logging is best
/// effort: when the target cannot be opened the server still runs with the
/// stdout layer alone.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match open_log_file() {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn log_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("FORMRAG_LOG_FILE") {
        return Some(PathBuf::from(path));
    }
    // The subscriber is not installed yet, so setup failures go to stderr.
    if let Err(error) = std::fs::create_dir_all("logs") {
        eprintln!("logging: cannot create logs directory, file layer disabled: {error}");
        return None;
    }
    Some(PathBuf::from("logs/formrag.log"))
}

fn open_log_file() -> Option<File> {
    let path = log_file_path()?;
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(error) => {
            eprintln!(
                "logging: cannot open {}, file layer disabled: {error}",
                path.display()
            );
            None
        }
    }
}
