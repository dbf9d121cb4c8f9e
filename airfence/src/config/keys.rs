//! `section.key` accessors for individual settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_value, require_positive};
use super::{expand_tilde, ConfigError, ConfigFile};

/// A single addressable configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BoundaryPath,
    StorageDatabase,
    PollIntervalSecs,
    PollFetchRetries,
    PollRetryBackoffMs,
    PollRecordRetries,
    OpenSkyUrl,
    OpenSkyUsername,
    OpenSkyPassword,
    OpenSkyTimeoutSecs,
    TrackerStaleAfterSecs,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::BoundaryPath,
            ConfigKey::StorageDatabase,
            ConfigKey::PollIntervalSecs,
            ConfigKey::PollFetchRetries,
            ConfigKey::PollRetryBackoffMs,
            ConfigKey::PollRecordRetries,
            ConfigKey::OpenSkyUrl,
            ConfigKey::OpenSkyUsername,
            ConfigKey::OpenSkyPassword,
            ConfigKey::OpenSkyTimeoutSecs,
            ConfigKey::TrackerStaleAfterSecs,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::BoundaryPath => "boundary.path",
            ConfigKey::StorageDatabase => "storage.database",
            ConfigKey::PollIntervalSecs => "poll.interval_secs",
            ConfigKey::PollFetchRetries => "poll.fetch_retries",
            ConfigKey::PollRetryBackoffMs => "poll.retry_backoff_ms",
            ConfigKey::PollRecordRetries => "poll.record_retries",
            ConfigKey::OpenSkyUrl => "opensky.url",
            ConfigKey::OpenSkyUsername => "opensky.username",
            ConfigKey::OpenSkyPassword => "opensky.password",
            ConfigKey::OpenSkyTimeoutSecs => "opensky.timeout_secs",
            ConfigKey::TrackerStaleAfterSecs => "tracker.stale_after_secs",
        }
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        self.split().0
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        self.name().split_once('.').unwrap_or(("", self.name()))
    }

    /// Whether the value should be masked when displayed.
    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::OpenSkyPassword)
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let path = |p: &PathBuf| p.display().to_string();
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();

        match self {
            ConfigKey::BoundaryPath => config.boundary.path.as_ref().map(path).unwrap_or_default(),
            ConfigKey::StorageDatabase => path(&config.storage.database),
            ConfigKey::PollIntervalSecs => config.poll.interval_secs.to_string(),
            ConfigKey::PollFetchRetries => config.poll.fetch_retries.to_string(),
            ConfigKey::PollRetryBackoffMs => config.poll.retry_backoff_ms.to_string(),
            ConfigKey::PollRecordRetries => config.poll.record_retries.to_string(),
            ConfigKey::OpenSkyUrl => config.opensky.url.clone(),
            ConfigKey::OpenSkyUsername => opt(&config.opensky.username),
            ConfigKey::OpenSkyPassword => opt(&config.opensky.password),
            ConfigKey::OpenSkyTimeoutSecs => config.opensky.timeout_secs.to_string(),
            ConfigKey::TrackerStaleAfterSecs => config
                .tracker
                .stale_after_secs
                .map(|s| s.to_string())
                .unwrap_or_default(),
        }
    }

    /// Set a value from text. An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let name = self.name();
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match self {
            ConfigKey::BoundaryPath => {
                config.boundary.path = (!value.is_empty()).then(|| expand_tilde(value));
            }
            ConfigKey::StorageDatabase => {
                if value.is_empty() {
                    return Err(empty_value(name));
                }
                config.storage.database = expand_tilde(value);
            }
            ConfigKey::PollIntervalSecs => {
                let secs = parse_value(name, value)?;
                require_positive(name, secs)?;
                config.poll.interval_secs = secs;
            }
            ConfigKey::PollFetchRetries => config.poll.fetch_retries = parse_value(name, value)?,
            ConfigKey::PollRetryBackoffMs => config.poll.retry_backoff_ms = parse_value(name, value)?,
            ConfigKey::PollRecordRetries => config.poll.record_retries = parse_value(name, value)?,
            ConfigKey::OpenSkyUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        key: name.to_string(),
                        value: value.to_string(),
                        reason: "must be an http(s) URL".to_string(),
                    });
                }
                config.opensky.url = value.to_string();
            }
            ConfigKey::OpenSkyUsername => config.opensky.username = optional(),
            ConfigKey::OpenSkyPassword => config.opensky.password = optional(),
            ConfigKey::OpenSkyTimeoutSecs => {
                let secs = parse_value(name, value)?;
                require_positive(name, secs)?;
                config.opensky.timeout_secs = secs;
            }
            ConfigKey::TrackerStaleAfterSecs => {
                config.tracker.stale_after_secs = if value.is_empty() {
                    None
                } else {
                    let secs = parse_value(name, value)?;
                    require_positive(name, secs)?;
                    Some(secs)
                };
            }
        }
        Ok(())
    }
}

fn empty_value(key: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: String::new(),
        reason: "must not be empty".to_string(),
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
