//! CLI error type and exit codes.

use thiserror::Error;

use airfence::app::AppError;
use airfence::boundary::GeometryLoadError;
use airfence::config::ConfigError;
use airfence::logging::LoggingError;
use airfence::recorder::RecordError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Failed to load boundary: {0}")]
    Boundary(#[from] GeometryLoadError),

    #[error("Observation store error: {0}")]
    Storage(#[from] RecordError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Boundary problems exit with 2 so scripts can tell a bad geometry file
    /// apart from runtime failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Boundary(_) | CliError::App(AppError::Geometry(_)) => 2,
            _ => 1,
        }
    }
}
