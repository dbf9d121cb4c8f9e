//! Logging setup.
//!
//! Installs a global `tracing` subscriber with two layers:
//!
//! ```text
//! tracing macros ──► EnvFilter ──┬──► stderr (human-readable)
//!                                └──► daily rolling file (optional, non-blocking)
//! ```
//!
//! `RUST_LOG` overrides the default directive when set.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name prefix; the appender adds the date.
pub const LOG_FILE_PREFIX: &str = "airfence.log";

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_directive: String,
    /// Directory for daily log files; `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: "airfence=info".to_string(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Raise the default level to debug.
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.default_directive = "airfence=debug".to_string();
        }
        self
    }

    /// Also write to daily files in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Keeps the file writer alive; buffered lines are flushed when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) = file_writer(dir)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn file_writer(
    dir: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        assert_eq!(LoggingConfig::default().default_directive, "airfence=info");
        assert_eq!(
            LoggingConfig::default().verbose(true).default_directive,
            "airfence=debug"
        );
        assert_eq!(
            LoggingConfig::default().verbose(false).default_directive,
            "airfence=info"
        );
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let (_writer, _guard) = file_writer(&logs).unwrap();
        assert!(logs.is_dir());
    }
}
