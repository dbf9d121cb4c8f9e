//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::AppError;
use crate::config::ConfigFile;
use crate::engine::EngineConfig;
use crate::feed::{Credentials, DEFAULT_TIMEOUT_SECS, OPENSKY_STATES_URL};
use crate::poller::PollerConfig;
use crate::tracker::TrackerConfig;

/// Where observations are written.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageTarget {
    /// SQLite database file.
    Sqlite(PathBuf),
    /// Process memory only; nothing survives the session.
    Memory,
}

/// Upstream feed settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// State-vector endpoint.
    pub url: String,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: OPENSKY_STATES_URL.to_string(),
            credentials: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Everything needed to start an [`super::AirFenceApp`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// GeoJSON boundary file.
    pub boundary_path: PathBuf,
    /// Observation store.
    pub storage: StorageTarget,
    /// Upstream feed.
    pub feed: FeedSettings,
    /// Poll loop timing and fetch retries.
    pub poller: PollerConfig,
    /// Record retries.
    pub engine: EngineConfig,
    /// Membership staleness.
    pub tracker: TrackerConfig,
}

impl AppConfig {
    /// Create a config with defaults for everything but the boundary and store.
    pub fn new(boundary_path: impl Into<PathBuf>, storage: StorageTarget) -> Self {
        Self {
            boundary_path: boundary_path.into(),
            storage,
            feed: FeedSettings::default(),
            poller: PollerConfig::default(),
            engine: EngineConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }

    /// Translate a loaded configuration file.
    ///
    /// Fails when no boundary path is configured.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, AppError> {
        let boundary_path = config.boundary.path.clone().ok_or_else(|| {
            AppError::Config(
                "no boundary file configured (set boundary.path or pass --boundary)".to_string(),
            )
        })?;

        let tracker = match config.tracker.stale_after_secs {
            Some(secs) => TrackerConfig::default().with_stale_after(Duration::from_secs(secs)),
            None => TrackerConfig::default(),
        };

        Ok(Self {
            boundary_path,
            storage: StorageTarget::Sqlite(config.storage.database.clone()),
            feed: FeedSettings {
                url: config.opensky.url.clone(),
                credentials: Credentials::from_parts(
                    config.opensky.username.as_deref(),
                    config.opensky.password.as_deref(),
                ),
                timeout_secs: config.opensky.timeout_secs,
            },
            poller: PollerConfig::default()
                .with_interval(Duration::from_secs(config.poll.interval_secs))
                .with_fetch_retries(config.poll.fetch_retries)
                .with_retry_backoff(Duration::from_millis(config.poll.retry_backoff_ms)),
            engine: EngineConfig::default().with_record_retries(config.poll.record_retries),
            tracker,
        })
    }

    /// Use a different boundary file.
    pub fn with_boundary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.boundary_path = path.into();
        self
    }

    /// Use a different observation store.
    pub fn with_storage(mut self, storage: StorageTarget) -> Self {
        self.storage = storage;
        self
    }

    /// Set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.poller.interval = interval;
        self
    }

    /// Set the poller configuration.
    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    /// Set the tracker configuration.
    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }
}
