use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file written in the current directory when `--debug` is passed
pub const DEBUG_LOG: &str = "debug.log";

/// Route `tracing` output to `path` when `debug` is set.
///
/// Nothing is installed otherwise: anything written to stderr would land on
/// top of the alternate screen. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(debug: bool, path: &Path) -> anyhow::Result<Option<WorkerGuard>> {
    if !debug {
        return Ok(None);
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))?;

    Ok(Some(guard))
}
