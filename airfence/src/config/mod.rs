//! Persistent configuration.
//!
//! Settings live in an INI file at `~/.airfence/config.ini`. Missing files and
//! missing keys fall back to defaults; values that are present but invalid are
//! reported as [`ConfigError`]s rather than silently ignored.
//!
//! ```text
//! [boundary]      path
//! [storage]       database
//! [poll]          interval_secs, fetch_retries, retry_backoff_ms, record_retries
//! [opensky]       url, username, password, timeout_secs
//! [tracker]       stale_after_secs
//! ```
//!
//! [`ConfigKey`] gives `section.key` access for the CLI `config` commands.

mod file;
mod keys;

use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    BoundarySettings, ConfigFile, OpenSkySettings, PollSettings, StorageSettings,
    TrackerSettings,
};
pub use keys::ConfigKey;

/// Name of the per-user configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".airfence";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default observation database file name.
pub const DEFAULT_DATABASE_NAME: &str = "aircraft_positions.db";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// The per-user configuration directory (`~/.airfence`).
///
/// Falls back to the current directory when no home directory is known.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Full path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_path_under_config_directory() {
        let path = config_file_path();
        assert!(path.ends_with(".airfence/config.ini"));
        assert_eq!(path.parent(), Some(config_directory().as_path()));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/var/db/x.db"), PathBuf::from("/var/db/x.db"));
        assert_eq!(expand_tilde(" relative.db "), PathBuf::from("relative.db"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/a/b.db"), home.join("a/b.db"));
            assert_eq!(expand_tilde("~"), home);
        }
    }
}
