//! INI-backed configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use tracing::debug;

use super::{config_directory, config_file_path, expand_tilde, ConfigError, DEFAULT_DATABASE_NAME};
use crate::feed::{DEFAULT_TIMEOUT_SECS, OPENSKY_STATES_URL};
use crate::poller::{DEFAULT_FETCH_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_BACKOFF};
use crate::engine::DEFAULT_RECORD_RETRIES;

/// `[boundary]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundarySettings {
    /// GeoJSON boundary file. Required to run.
    pub path: Option<PathBuf>,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// SQLite database file.
    pub database: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: config_directory().join(DEFAULT_DATABASE_NAME),
        }
    }
}

/// `[poll]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub interval_secs: u64,
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
    pub record_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            record_retries: DEFAULT_RECORD_RETRIES,
        }
    }
}

/// `[opensky]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSkySettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OpenSkySettings {
    fn default() -> Self {
        Self {
            url: OPENSKY_STATES_URL.to_string(),
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[tracker]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSettings {
    /// Forget membership after this many seconds without an update.
    pub stale_after_secs: Option<u64>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub boundary: BoundarySettings,
    pub storage: StorageSettings,
    pub poll: PollSettings,
    pub opensky: OpenSkySettings,
    pub tracker: TrackerSettings,
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_file_path())
    }

    /// Load from a specific file; a missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let ini = Ini::load_from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to a specific file, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |section: &str, key: &str| {
            ini.get_from(Some(section), key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            boundary: BoundarySettings {
                path: get("boundary", "path").map(expand_tilde),
            },
            storage: StorageSettings {
                database: get("storage", "database")
                    .map(expand_tilde)
                    .unwrap_or(defaults.storage.database),
            },
            poll: PollSettings {
                interval_secs: parse_or("poll.interval_secs", get("poll", "interval_secs"), defaults.poll.interval_secs)?,
                fetch_retries: parse_or("poll.fetch_retries", get("poll", "fetch_retries"), defaults.poll.fetch_retries)?,
                retry_backoff_ms: parse_or("poll.retry_backoff_ms", get("poll", "retry_backoff_ms"), defaults.poll.retry_backoff_ms)?,
                record_retries: parse_or("poll.record_retries", get("poll", "record_retries"), defaults.poll.record_retries)?,
            },
            opensky: OpenSkySettings {
                url: get("opensky", "url")
                    .map(str::to_string)
                    .unwrap_or(defaults.opensky.url),
                username: get("opensky", "username").map(str::to_string),
                password: get("opensky", "password").map(str::to_string),
                timeout_secs: parse_or("opensky.timeout_secs", get("opensky", "timeout_secs"), defaults.opensky.timeout_secs)?,
            },
            tracker: TrackerSettings {
                stale_after_secs: get("tracker", "stale_after_secs")
                    .map(|v| parse_value("tracker.stale_after_secs", v))
                    .transpose()?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("poll.interval_secs", self.poll.interval_secs)?;
        require_positive("opensky.timeout_secs", self.opensky.timeout_secs)?;
        if let Some(secs) = self.tracker.stale_after_secs {
            require_positive("tracker.stale_after_secs", secs)?;
        }
        Ok(())
    }

    fn to_ini(&self) -> Ini {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut ini = Ini::new();

        ini.with_section(Some("boundary")).set(
            "path",
            self.boundary
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );
        ini.with_section(Some("storage"))
            .set("database", self.storage.database.display().to_string());
        ini.with_section(Some("poll"))
            .set("interval_secs", self.poll.interval_secs.to_string())
            .set("fetch_retries", self.poll.fetch_retries.to_string())
            .set("retry_backoff_ms", self.poll.retry_backoff_ms.to_string())
            .set("record_retries", self.poll.record_retries.to_string());
        ini.with_section(Some("opensky"))
            .set("url", self.opensky.url.clone())
            .set("username", opt(&self.opensky.username))
            .set("password", opt(&self.opensky.password))
            .set("timeout_secs", self.opensky.timeout_secs.to_string());
        ini.with_section(Some("tracker")).set(
            "stale_after_secs",
            self.tracker
                .stale_after_secs
                .map(|s| s.to_string())
                .unwrap_or_default(),
        );

        ini
    }
}

/// Parse a config value, naming the key on failure.
pub(super) fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(key: &str, raw: Option<&str>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| parse_value(key, v)).unwrap_or(Ok(default))
}

pub(super) fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("config.ini");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.poll.interval_secs, 120);
        assert_eq!(config.poll.fetch_retries, 2);
        assert_eq!(config.opensky.url, OPENSKY_STATES_URL);
        assert!(config.boundary.path.is_none());
        assert!(config.tracker.stale_after_secs.is_none());
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "[boundary]\npath = /data/ukraine.geojson\n\n[poll]\ninterval_secs = 30\n\n[opensky]\nusername = pilot\npassword =\n",
        );

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(
            config.boundary.path,
            Some(PathBuf::from("/data/ukraine.geojson"))
        );
        assert_eq!(config.poll.interval_secs, 30);
        assert_eq!(config.poll.record_retries, 1);
        assert_eq!(config.opensky.username.as_deref(), Some("pilot"));
        assert_eq!(config.opensky.password, None);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[poll]\ninterval_secs = soon\n");
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "poll.interval_secs"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[poll]\ninterval_secs = 0\n");
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_save_then_load_preserves_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.boundary.path = Some(PathBuf::from("/data/zone.geojson"));
        config.storage.database = PathBuf::from("/data/positions.db");
        config.opensky.username = Some("pilot".to_string());
        config.opensky.password = Some("secret".to_string());
        config.tracker.stale_after_secs = Some(3600);
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }
}
