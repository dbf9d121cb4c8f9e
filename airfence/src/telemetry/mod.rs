//! Poll-loop telemetry for observability and user feedback.
//!
//! Lock-free atomic counters are updated by the engine and poller; a
//! point-in-time [`TelemetrySnapshot`] is taken for display.
//!
//! # Architecture
//!
//! ```text
//! Engine / Poller ─────► PollMetrics ─────► TelemetrySnapshot ─────► Views
//!                        (atomic counters)  (point-in-time copy)     (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use airfence::telemetry::PollMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(PollMetrics::new());
//! metrics.cycle_completed();
//! let snapshot = metrics.snapshot();
//! println!("Cycles: {}", snapshot.cycles_completed);
//! ```

mod metrics;
mod snapshot;

pub use metrics::PollMetrics;
pub use snapshot::TelemetrySnapshot;
