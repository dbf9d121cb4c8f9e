//! Cancellable polling loop.
//!
//! The [`Poller`] fetches one batch per tick for the boundary's bounding box
//! and hands it to the [`GeofenceEngine`]. A fetch that still fails after its
//! retries skips the cycle; tracker state is untouched and the loop waits for
//! the next tick.
//!
//! ```text
//!  tick ──► fetch (retry, linear backoff) ──► engine.process_batch ──► metrics
//!   ▲              │ error                                               │
//!   │              ▼                                                     │
//!   │        cycle skipped                                               │
//!   └──────────────────────────── interval ◄─────────────────────────────┘
//! ```
//!
//! Each cycle runs on the blocking pool because both the HTTP client and the
//! recorder block. Shutdown is observed between cycles and, through the
//! engine, between observations.
//!
//! # Example
//!
//! ```ignore
//! use airfence::poller::{Poller, PollerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let poller = Arc::new(Poller::new(source, engine, boundary.bounds(), PollerConfig::default()));
//! let shutdown = CancellationToken::new();
//! let handle = poller.spawn(shutdown.clone());
//! // ...
//! shutdown.cancel();
//! handle.wait().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{CycleReport, GeofenceEngine};
use crate::feed::{FeedBatch, FetchError, TelemetrySource};
use crate::geo_bounds::GeoBounds;

/// Default time between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Default number of extra fetch attempts per cycle.
pub const DEFAULT_FETCH_RETRIES: u32 = 2;

/// Default base delay between fetch attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(2000);

/// Smallest interval accepted by the ticker.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Extra fetch attempts after the first failure.
    pub fetch_retries: u32,
    /// Base backoff; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl PollerConfig {
    /// Set the cycle interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of extra fetch attempts.
    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    /// Set the base retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Drives fetch → process cycles.
pub struct Poller {
    source: Arc<dyn TelemetrySource>,
    engine: Arc<GeofenceEngine>,
    bounds: GeoBounds,
    config: PollerConfig,
}

impl Poller {
    /// Create a poller for a region.
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        engine: Arc<GeofenceEngine>,
        bounds: GeoBounds,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            engine,
            bounds,
            config,
        }
    }

    /// The engine this poller feeds.
    pub fn engine(&self) -> &Arc<GeofenceEngine> {
        &self.engine
    }

    /// The active configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Run one complete cycle on the calling thread.
    ///
    /// Returns the fetch error when the cycle was skipped.
    pub fn run_cycle(&self, shutdown: &CancellationToken) -> Result<CycleReport, FetchError> {
        let metrics = self.engine.metrics();

        let batch = match self.fetch_with_retry(shutdown) {
            Ok(batch) => batch,
            Err(e) => {
                metrics.cycle_skipped();
                warn!(source = self.source.name(), error = %e, "Fetch failed, skipping cycle");
                return Err(e);
            }
        };

        metrics.entries_discarded(batch.discarded);
        debug!(
            observations = batch.len(),
            discarded = batch.discarded,
            "Fetched batch"
        );

        let report = self.engine.process_batch(batch.observations, shutdown);
        metrics.cycle_completed();

        if report.record_failures.is_empty() {
            debug!(
                processed = report.processed,
                inside = report.inside,
                transitions = report.transitions(),
                "Cycle complete"
            );
        } else {
            warn!(
                processed = report.processed,
                failed = report.record_failures.len(),
                "Cycle complete with record failures"
            );
        }

        Ok(report)
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next tick instead of bursting.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let period = self.config.interval.max(MIN_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = self.source.name(),
            bounds = %self.bounds,
            interval_secs = period.as_secs_f64(),
            "Polling started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    let poller = Arc::clone(&self);
                    let token = shutdown.clone();
                    let cycle = tokio::task::spawn_blocking(move || poller.run_cycle(&token));

                    if let Err(e) = cycle.await {
                        warn!(error = %e, "Cycle task failed");
                    }
                }
            }
        }

        info!("Polling stopped");
    }

    /// Spawn [`Poller::run`] on the current runtime.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> PollerHandle {
        let join = tokio::spawn(self.run(shutdown.clone()));
        PollerHandle { shutdown, join }
    }

    fn fetch_with_retry(&self, shutdown: &CancellationToken) -> Result<FeedBatch, FetchError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch(&self.bounds) {
                Ok(batch) => return Ok(batch),
                Err(e) => {
                    self.engine.metrics().fetch_failed();
                    if attempt >= self.config.fetch_retries || shutdown.is_cancelled() {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = self.config.retry_backoff * attempt;
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying fetch");
                    if !wait_backoff(delay, shutdown) {
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Handle to a spawned polling loop.
pub struct PollerHandle {
    shutdown: CancellationToken,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Request shutdown; the current observation finishes first.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait for the loop to exit.
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            warn!(error = %e, "Polling task ended abnormally");
        }
    }
}

/// Wait out a retry backoff from the blocking pool. Returns false if
/// `shutdown` fired first.
///
/// Cycles run inside `spawn_blocking`, so the loop's runtime is reachable
/// through `Handle::try_current` and the wait parks on `cancelled()` like the
/// async loop does. Cycles driven directly from a plain thread get a
/// throwaway current-thread runtime.
fn wait_backoff(delay: Duration, shutdown: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !shutdown.is_cancelled();
    }

    let wait = async {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    };

    match Handle::try_current() {
        Ok(handle) => handle.block_on(wait),
        Err(_) => match Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime.block_on(wait),
            Err(e) => {
                warn!(error = %e, "Backoff runtime unavailable, sleeping without cancellation");
                std::thread::sleep(delay);
                !shutdown.is_cancelled()
            }
        },
    }
}
