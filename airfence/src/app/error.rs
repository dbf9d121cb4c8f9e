//! Application error types.

use thiserror::Error;

use crate::boundary::GeometryLoadError;
use crate::config::ConfigError;
use crate::feed::FetchError;
use crate::recorder::RecordError;

/// Errors that can occur during application startup and lifecycle.
#[derive(Debug, Error)]
pub enum AppError {
    /// The boundary could not be loaded. Always fatal.
    #[error("Failed to load boundary: {0}")]
    Geometry(#[from] GeometryLoadError),

    /// The observation store could not be opened.
    #[error("Failed to open observation store: {0}")]
    Storage(#[from] RecordError),

    /// The telemetry client could not be created.
    #[error("Failed to create telemetry source: {0}")]
    Feed(#[from] FetchError),

    /// The configuration file could not be read.
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    /// Required settings are missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to create the Tokio runtime.
    #[error("Failed to create Tokio runtime: {0}")]
    RuntimeCreation(String),
}
