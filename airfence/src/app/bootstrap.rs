//! Application assembly and run loop.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AppConfig, AppError, StorageTarget};
use crate::boundary::Boundary;
use crate::engine::GeofenceEngine;
use crate::feed::{OpenSkySource, ReqwestClient, TelemetrySource};
use crate::poller::Poller;
use crate::recorder::{MemoryRecorder, ObservationRecorder, SqliteRecorder};
use crate::sink::{EventSink, LogSink};
use crate::telemetry::PollMetrics;
use crate::tracker::TransitionTracker;

/// A fully wired AirFence instance.
///
/// # Example
///
/// ```ignore
/// let app = AirFenceApp::start(config)?;
/// let shutdown = CancellationToken::new();
/// app.run_blocking(shutdown.clone())?;
/// ```
pub struct AirFenceApp {
    boundary: Arc<Boundary>,
    tracker: Arc<TransitionTracker>,
    recorder: Arc<dyn ObservationRecorder>,
    metrics: Arc<PollMetrics>,
    poller: Arc<Poller>,
    config: AppConfig,
}

impl AirFenceApp {
    /// Start with the OpenSky feed and log-only event output.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        let boundary = Self::load_boundary(&config)?;

        let client = ReqwestClient::with_timeout(config.feed.timeout_secs)?;
        let source = OpenSkySource::new(client)
            .with_base_url(config.feed.url.clone())
            .with_credentials(config.feed.credentials.clone());

        Self::assemble(config, boundary, Arc::new(source), Arc::new(LogSink))
    }

    /// Start with an injected feed and event sink.
    pub fn start_with(
        config: AppConfig,
        source: Arc<dyn TelemetrySource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, AppError> {
        let boundary = Self::load_boundary(&config)?;
        Self::assemble(config, boundary, source, sink)
    }

    fn load_boundary(config: &AppConfig) -> Result<Arc<Boundary>, AppError> {
        // Nothing else exists yet if this fails.
        Ok(Arc::new(Boundary::load(&config.boundary_path)?))
    }

    fn assemble(
        config: AppConfig,
        boundary: Arc<Boundary>,
        source: Arc<dyn TelemetrySource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, AppError> {
        let recorder: Arc<dyn ObservationRecorder> = match &config.storage {
            StorageTarget::Sqlite(path) => {
                info!(path = %path.display(), "Opening observation store");
                Arc::new(SqliteRecorder::open(path)?)
            }
            StorageTarget::Memory => {
                info!("Using in-memory observation store");
                Arc::new(MemoryRecorder::new())
            }
        };

        let tracker = Arc::new(TransitionTracker::new(config.tracker.clone()));
        let metrics = Arc::new(PollMetrics::new());

        let engine = GeofenceEngine::new(
            boundary.clone(),
            tracker.clone(),
            recorder.clone(),
            sink,
            metrics.clone(),
        )
        .with_config(config.engine.clone());

        let poller = Arc::new(Poller::new(
            source,
            Arc::new(engine),
            boundary.bounds(),
            config.poller.clone(),
        ));

        info!(
            boundary = %config.boundary_path.display(),
            bounds = %boundary.bounds(),
            "AirFence started"
        );

        Ok(Self {
            boundary,
            tracker,
            recorder,
            metrics,
            poller,
            config,
        })
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        Arc::clone(&self.poller).run(shutdown).await;
    }

    /// Poll until `shutdown` is cancelled on a dedicated runtime.
    pub fn run_blocking(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        let runtime = Runtime::new().map_err(|e| AppError::RuntimeCreation(e.to_string()))?;
        runtime.block_on(self.run(shutdown));
        Ok(())
    }

    /// The loaded boundary.
    pub fn boundary(&self) -> &Arc<Boundary> {
        &self.boundary
    }

    /// Membership state for all entities seen this session.
    pub fn tracker(&self) -> &Arc<TransitionTracker> {
        &self.tracker
    }

    /// The observation store.
    pub fn recorder(&self) -> &Arc<dyn ObservationRecorder> {
        &self.recorder
    }

    /// Session counters.
    pub fn metrics(&self) -> &Arc<PollMetrics> {
        &self.metrics
    }

    /// The poller, for driving single cycles.
    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// The configuration the app was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::GeometryLoadError;
    use crate::feed::{FeedBatch, FetchError};
    use crate::geo_bounds::GeoBounds;
    use tempfile::TempDir;

    const SQUARE: &str = r#"{"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}"#;

    struct EmptySource;

    impl TelemetrySource for EmptySource {
        fn fetch(&self, _bounds: &GeoBounds) -> Result<FeedBatch, FetchError> {
            Ok(FeedBatch::default())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[test]
    fn test_missing_boundary_fails_before_store_is_created() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("positions.db");
        let config = AppConfig::new(
            dir.path().join("missing.geojson"),
            StorageTarget::Sqlite(db.clone()),
        );

        let result = AirFenceApp::start_with(config, Arc::new(EmptySource), Arc::new(LogSink));
        assert!(matches!(
            result,
            Err(AppError::Geometry(GeometryLoadError::Read { .. }))
        ));
        assert!(!db.exists());
    }

    #[test]
    fn test_start_wires_components() {
        let dir = TempDir::new().unwrap();
        let boundary = dir.path().join("zone.geojson");
        std::fs::write(&boundary, SQUARE).unwrap();

        let app = AirFenceApp::start_with(
            AppConfig::new(&boundary, StorageTarget::Sqlite(dir.path().join("db/positions.db"))),
            Arc::new(EmptySource),
            Arc::new(LogSink),
        )
        .unwrap();

        assert_eq!(app.boundary().polygon_count(), 1);
        assert!(app.tracker().is_empty());
        assert_eq!(app.recorder().count().unwrap(), 0);
        assert!(dir.path().join("db/positions.db").exists());

        let report = app.poller().run_cycle(&CancellationToken::new()).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(app.metrics().snapshot().cycles_completed, 1);
    }
}
