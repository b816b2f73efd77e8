//! Tracing configuration and log routing.
//!
//! Everything goes to stdout through a compact formatter. A second, non-blocking layer appends
//! the same events (with targets, without ANSI colors) to the configured log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Respects `RUST_LOG` for filtering (defaults to `info`). The returned guard flushes the file
/// writer on drop, so the caller keeps it alive for the lifetime of the process. When the log
/// file cannot be opened only stdout logging is installed and `None` is returned.
pub fn init_tracing(log_file: &Path) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer(log_file) {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            tracing::debug!(path = %log_file.display(), "File logging enabled");
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn file_writer(log_file: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match open_log_file(log_file) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", log_file.display());
            None
        }
    }
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
