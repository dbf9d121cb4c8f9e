//! CLI command implementations.

pub mod check;
pub mod config;
pub mod history;
pub mod init;
pub mod run;

use std::path::PathBuf;

use airfence::config::config_file_path;

/// The `--config` file when given, otherwise `~/.airfence/config.ini`.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(config_file_path)
}
