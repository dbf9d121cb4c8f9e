//! Atomic counters for the poll loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;
use crate::model::Direction;

/// Counters shared between the engine, the poller and any observer.
#[derive(Debug)]
pub struct PollMetrics {
    started: Instant,
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    fetch_failures: AtomicU64,
    observations_processed: AtomicU64,
    observations_inside: AtomicU64,
    entries_discarded: AtomicU64,
    entered: AtomicU64,
    left: AtomicU64,
    record_failures: AtomicU64,
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PollMetrics {
    /// Create zeroed counters; uptime starts now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            cycles_completed: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            observations_processed: AtomicU64::new(0),
            observations_inside: AtomicU64::new(0),
            entries_discarded: AtomicU64::new(0),
            entered: AtomicU64::new(0),
            left: AtomicU64::new(0),
            record_failures: AtomicU64::new(0),
        }
    }

    /// A cycle ran to completion (possibly with record failures).
    pub fn cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A cycle was skipped because the fetch failed.
    pub fn cycle_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// One fetch attempt failed.
    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries dropped before reaching the engine.
    pub fn entries_discarded(&self, count: usize) {
        self.entries_discarded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// An observation went through oracle, tracker and recorder.
    pub fn observation_processed(&self, inside: bool) {
        self.observations_processed.fetch_add(1, Ordering::Relaxed);
        if inside {
            self.observations_inside.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A transition was emitted.
    pub fn transition(&self, direction: Direction) {
        match direction {
            Direction::Entered => self.entered.fetch_add(1, Ordering::Relaxed),
            Direction::Left => self.left.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// An append failed after all retries.
    pub fn record_failed(&self) {
        self.record_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started.elapsed(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            observations_processed: self.observations_processed.load(Ordering::Relaxed),
            observations_inside: self.observations_inside.load(Ordering::Relaxed),
            entries_discarded: self.entries_discarded.load(Ordering::Relaxed),
            entered: self.entered.load(Ordering::Relaxed),
            left: self.left.load(Ordering::Relaxed),
            record_failures: self.record_failures.load(Ordering::Relaxed),
        }
    }
}
