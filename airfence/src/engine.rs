//! Per-observation geofence processing.
//!
//! The [`GeofenceEngine`] runs every valid observation through the same fixed
//! sequence and is the only place the four core components meet:
//!
//! ```text
//! Observation
//!     │
//!     ▼
//! ┌──────────────────┐   inside?   ┌───────────────────┐
//! │ MembershipOracle │────────────►│ TransitionTracker │──► Option<TransitionEvent>
//! └──────────────────┘             └─────────┬─────────┘
//!                                            ▼
//!                                  ┌────────────────────┐
//!                                  │ ObservationRecorder│──► RecordId | RecordError
//!                                  └─────────┬──────────┘
//!                                            ▼
//!                                  ┌────────────────────┐
//!                                  │ EventSink          │   (only on transition)
//!                                  └────────────────────┘
//! ```
//!
//! A failed append never aborts the cycle and never rolls back the tracker:
//! the transition decision stands even when the durable log missed the row.
//!
//! # Example
//!
//! ```ignore
//! use airfence::engine::{EngineConfig, GeofenceEngine};
//!
//! let engine = GeofenceEngine::new(oracle, tracker, recorder, sink, metrics)
//!     .with_config(EngineConfig::default().with_record_retries(2));
//! let report = engine.process_batch(batch.observations, &shutdown);
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::boundary::MembershipOracle;
use crate::model::{Direction, EntityId, Observation, TransitionEvent};
use crate::recorder::{ObservationRecorder, RecordError, RecordId};
use crate::sink::EventSink;
use crate::telemetry::PollMetrics;
use crate::tracker::TransitionTracker;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of extra append attempts per observation.
pub const DEFAULT_RECORD_RETRIES: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extra append attempts after the first failure.
    pub record_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_retries: DEFAULT_RECORD_RETRIES,
        }
    }
}

impl EngineConfig {
    /// Set the number of extra append attempts.
    pub fn with_record_retries(mut self, retries: u32) -> Self {
        self.record_retries = retries;
        self
    }
}

// =============================================================================
// Results
// =============================================================================

/// Result of processing one observation.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Oracle result for the observation's position.
    pub inside: bool,
    /// Outcome of the append (after retries).
    pub record: Result<RecordId, RecordError>,
    /// Transition produced by the tracker, if any.
    pub event: Option<TransitionEvent>,
}

/// An append that failed after all retries.
#[derive(Debug)]
pub struct RecordFailure {
    /// Entity whose row was lost.
    pub entity: EntityId,
    /// Final error.
    pub error: RecordError,
}

/// Summary of one processed batch.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Observations fully processed.
    pub processed: usize,
    /// Observations not started because shutdown was requested.
    pub skipped: usize,
    /// Processed observations found inside the boundary.
    pub inside: usize,
    /// Transitions emitted, in processing order.
    pub events: Vec<TransitionEvent>,
    /// Appends that failed.
    pub record_failures: Vec<RecordFailure>,
    /// Whether processing stopped early on cancellation.
    pub cancelled: bool,
}

impl CycleReport {
    /// Number of transitions emitted.
    pub fn transitions(&self) -> usize {
        self.events.len()
    }

    /// Number of "entered" transitions.
    pub fn entered(&self) -> usize {
        self.count_direction(Direction::Entered)
    }

    /// Number of "left" transitions.
    pub fn left(&self) -> usize {
        self.count_direction(Direction::Left)
    }

    /// Number of rows successfully appended.
    pub fn recorded(&self) -> usize {
        self.processed - self.record_failures.len()
    }

    fn count_direction(&self, direction: Direction) -> usize {
        self.events
            .iter()
            .filter(|e| e.direction() == direction)
            .count()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Oracle → Tracker → Recorder → sink pipeline for single observations.
pub struct GeofenceEngine {
    oracle: Arc<dyn MembershipOracle>,
    tracker: Arc<TransitionTracker>,
    recorder: Arc<dyn ObservationRecorder>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<PollMetrics>,
    config: EngineConfig,
}

impl GeofenceEngine {
    /// Create an engine with the default configuration.
    pub fn new(
        oracle: Arc<dyn MembershipOracle>,
        tracker: Arc<TransitionTracker>,
        recorder: Arc<dyn ObservationRecorder>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<PollMetrics>,
    ) -> Self {
        Self {
            oracle,
            tracker,
            recorder,
            sink,
            metrics,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Process one observation.
    ///
    /// Always attempts exactly one logical append, whatever the tracker
    /// decides (including out-of-order samples it ignores).
    pub fn process(&self, observation: &Observation) -> ProcessOutcome {
        let inside = self.oracle.contains(observation.position);
        let event = self.tracker.observe(observation, inside);
        let record = self.append_with_retry(observation, inside);

        self.metrics.observation_processed(inside);
        match &record {
            Ok(id) => debug!(
                entity = %observation.entity,
                record = %id,
                inside,
                "Observation processed"
            ),
            Err(e) => {
                self.metrics.record_failed();
                warn!(
                    entity = %observation.entity,
                    error = %e,
                    "Failed to record observation"
                );
            }
        }

        if let Some(event) = &event {
            self.metrics.transition(event.direction());
            self.sink.emit(event);
        }

        ProcessOutcome {
            inside,
            record,
            event,
        }
    }

    /// Process a batch on the calling thread.
    ///
    /// The batch is stable-sorted by timestamp first so that each entity's
    /// samples are applied in time order. Cancellation is checked before each
    /// observation; one already started always runs to completion.
    pub fn process_batch(
        &self,
        mut observations: Vec<Observation>,
        shutdown: &CancellationToken,
    ) -> CycleReport {
        observations.sort_by_key(|o| o.timestamp);

        let total = observations.len();
        let mut report = CycleReport::default();

        for observation in &observations {
            if shutdown.is_cancelled() {
                report.cancelled = true;
                report.skipped = total - report.processed;
                debug!(skipped = report.skipped, "Shutdown requested, stopping batch");
                break;
            }

            let outcome = self.process(observation);
            report.processed += 1;
            if outcome.inside {
                report.inside += 1;
            }
            if let Err(error) = outcome.record {
                report.record_failures.push(RecordFailure {
                    entity: observation.entity.clone(),
                    error,
                });
            }
            if let Some(event) = outcome.event {
                report.events.push(event);
            }
        }

        report
    }

    /// The tracker shared with this engine.
    pub fn tracker(&self) -> &Arc<TransitionTracker> {
        &self.tracker
    }

    /// The recorder shared with this engine.
    pub fn recorder(&self) -> &Arc<dyn ObservationRecorder> {
        &self.recorder
    }

    /// The metrics shared with this engine.
    pub fn metrics(&self) -> &Arc<PollMetrics> {
        &self.metrics
    }

    fn append_with_retry(
        &self,
        observation: &Observation,
        inside: bool,
    ) -> Result<RecordId, RecordError> {
        let mut attempt = 0;
        loop {
            match self.recorder.append(observation, inside) {
                Ok(id) => return Ok(id),
                Err(e) if attempt < self.config.record_retries => {
                    attempt += 1;
                    debug!(
                        entity = %observation.entity,
                        attempt,
                        error = %e,
                        "Append failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_bounds::Position;
    use crate::model::Membership;
    use crate::recorder::{MemoryRecorder, StoredObservation};
    use crate::sink::ChannelSink;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Inside when latitude is positive.
    struct NorthOracle;

    impl MembershipOracle for NorthOracle {
        fn contains(&self, position: Position) -> bool {
            position.latitude > 0.0
        }
    }

    /// Fails every append whose 1-based call number is listed.
    struct FlakyRecorder {
        inner: MemoryRecorder,
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl FlakyRecorder {
        fn failing_on(fail_on: Vec<usize>) -> Self {
            Self {
                inner: MemoryRecorder::new(),
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl ObservationRecorder for FlakyRecorder {
        fn append(&self, observation: &Observation, inside: bool) -> Result<RecordId, RecordError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(RecordError::Unavailable("disk full".to_string()));
            }
            self.inner.append(observation, inside)
        }

        fn history(&self, entity: &EntityId) -> Result<Vec<StoredObservation>, RecordError> {
            self.inner.history(entity)
        }

        fn entities(&self) -> Result<Vec<String>, RecordError> {
            self.inner.entities()
        }

        fn count(&self) -> Result<u64, RecordError> {
            self.inner.count()
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn obs(id: &str, lat: f64, secs: i64) -> Observation {
        Observation::new(EntityId::new(id).unwrap(), Position::new(lat, 10.0), at(secs))
            .unwrap()
            .with_label("TEST1")
    }

    fn engine_with(
        recorder: Arc<dyn ObservationRecorder>,
    ) -> (
        GeofenceEngine,
        tokio::sync::mpsc::UnboundedReceiver<TransitionEvent>,
    ) {
        let (sink, rx) = ChannelSink::new();
        let engine = GeofenceEngine::new(
            Arc::new(NorthOracle),
            Arc::new(TransitionTracker::with_defaults()),
            recorder,
            Arc::new(sink),
            Arc::new(PollMetrics::new()),
        );
        (engine, rx)
    }

    mod process {
        use super::*;

        #[test]
        fn test_first_sighting_records_without_event() {
            let recorder = Arc::new(MemoryRecorder::new());
            let (engine, mut rx) = engine_with(recorder.clone());

            let outcome = engine.process(&obs("a1", 5.0, 0));
            assert!(outcome.inside);
            assert!(outcome.event.is_none());
            assert_eq!(outcome.record.unwrap(), RecordId(1));
            assert!(rx.try_recv().is_err());
            assert_eq!(recorder.rows().len(), 1);
        }

        #[test]
        fn test_transition_reaches_sink() {
            let (engine, mut rx) = engine_with(Arc::new(MemoryRecorder::new()));

            engine.process(&obs("a1", -5.0, 0));
            let outcome = engine.process(&obs("a1", 5.0, 10));

            let event = outcome.event.unwrap();
            assert_eq!(event.previous, Membership::Outside);
            assert_eq!(event.current, Membership::Inside);
            assert_eq!(rx.try_recv().unwrap(), event);
            assert_eq!(engine.metrics().snapshot().entered, 1);
        }

        #[test]
        fn test_retry_recovers_transient_failure() {
            let recorder = Arc::new(FlakyRecorder::failing_on(vec![1]));
            let (engine, _rx) = engine_with(recorder.clone());

            let outcome = engine.process(&obs("a1", 5.0, 0));
            assert_eq!(outcome.record.unwrap(), RecordId(1));
            assert_eq!(recorder.inner.rows().len(), 1);
        }

        #[test]
        fn test_failure_after_retries_keeps_tracker_state() {
            let recorder = Arc::new(FlakyRecorder::failing_on(vec![1, 2]));
            let (engine, _rx) = engine_with(recorder.clone());

            let outcome = engine.process(&obs("a1", 5.0, 0));
            assert!(matches!(outcome.record, Err(RecordError::Unavailable(_))));
            assert_eq!(
                engine.tracker().state(&EntityId::new("a1").unwrap()),
                Membership::Inside
            );
            assert_eq!(engine.metrics().snapshot().record_failures, 1);
        }

        #[test]
        fn test_out_of_order_sample_still_recorded() {
            let recorder = Arc::new(MemoryRecorder::new());
            let (engine, _rx) = engine_with(recorder.clone());

            engine.process(&obs("a1", 5.0, 100));
            let late = engine.process(&obs("a1", -5.0, 50));

            assert!(late.event.is_none());
            assert!(late.record.is_ok());
            assert_eq!(recorder.rows().len(), 2);
        }
    }

    mod batch {
        use super::*;

        #[test]
        fn test_batch_sorted_by_timestamp() {
            let (engine, _rx) = engine_with(Arc::new(MemoryRecorder::new()));

            // Delivered out of order: inside@20 before outside@10.
            let report = engine.process_batch(
                vec![obs("a1", 5.0, 20), obs("a1", -5.0, 10)],
                &CancellationToken::new(),
            );

            assert_eq!(report.processed, 2);
            assert_eq!(report.entered(), 1);
            assert_eq!(report.left(), 0);
        }

        #[test]
        fn test_failure_mid_batch_continues() {
            let recorder = Arc::new(FlakyRecorder::failing_on(vec![2, 3]));
            let (engine, _rx) = engine_with(recorder.clone());

            let report = engine.process_batch(
                vec![obs("a1", -5.0, 0), obs("b2", 5.0, 1), obs("c3", 5.0, 2)],
                &CancellationToken::new(),
            );

            assert_eq!(report.processed, 3);
            assert_eq!(report.record_failures.len(), 1);
            assert_eq!(report.record_failures[0].entity.as_str(), "b2");
            assert_eq!(report.recorded(), 2);
            assert_eq!(report.inside, 2);
        }

        #[test]
        fn test_cancelled_batch_processes_nothing() {
            let recorder = Arc::new(MemoryRecorder::new());
            let (engine, _rx) = engine_with(recorder.clone());
            let shutdown = CancellationToken::new();
            shutdown.cancel();

            let report = engine.process_batch(vec![obs("a1", 5.0, 0), obs("a1", 5.0, 1)], &shutdown);

            assert!(report.cancelled);
            assert_eq!(report.processed, 0);
            assert_eq!(report.skipped, 2);
            assert!(recorder.rows().is_empty());
            assert!(engine.tracker().is_empty());
        }

        #[test]
        fn test_empty_batch() {
            let (engine, _rx) = engine_with(Arc::new(MemoryRecorder::new()));
            let report = engine.process_batch(Vec::new(), &CancellationToken::new());
            assert_eq!(report.processed, 0);
            assert!(!report.cancelled);
            assert_eq!(report.transitions(), 0);
        }
    }
}
