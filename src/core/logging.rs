use std::io;
use std::sync::OnceLock;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "policy-rag.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    LogDir { path: String, source: io::Error },
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Installs stdout logging plus a daily-rolling file under `paths.log_dir`.
///
/// `RUST_LOG` overrides the default `info` filter. A second call in the same
/// process returns [`LoggingError::AlreadyInstalled`].
pub fn init(paths: &AppPaths) -> Result<(), LoggingError> {
    let log_dir = &paths.log_dir;
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::LogDir {
        path: log_dir.display().to_string(),
        source,
    })?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()?;

    // the first successful install owns the flush guard
    let _ = LOG_GUARD.set(guard);
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
