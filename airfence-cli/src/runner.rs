//! Shared setup for commands that do real work.

use std::path::Path;

use airfence::config::{config_directory, ConfigFile};
use airfence::logging::{init_logging, LoggingConfig, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the active logging guard.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration (from `config_path` or the default location) and
    /// install logging. `log_to_file` adds daily files under `~/.airfence/logs`.
    pub fn new(
        config_path: Option<&Path>,
        verbose: bool,
        log_to_file: bool,
    ) -> Result<Self, CliError> {
        let mut logging = LoggingConfig::default().verbose(verbose);
        if log_to_file {
            logging = logging.with_log_dir(config_directory().join("logs"));
        }
        let guard = init_logging(&logging)?;

        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        Ok(Self {
            config,
            _logging: guard,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log a startup line for a command.
    pub fn log_startup(&self, command: &str) {
        info!(version = airfence::VERSION, command, "AirFence starting");
    }
}
