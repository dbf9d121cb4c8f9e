//! Append-only observation log.
//!
//! Every processed observation is appended exactly once, tagged with the raw
//! membership flag computed by the oracle for that observation. Whether the
//! observation caused a transition is irrelevant here; transitions can be
//! reconstructed later from the `in_boundary` column.
//!
//! Appends are not deduplicated: each call is a distinct sample, so callers may
//! retry a failed append without further coordination.
//!
//! # Implementations
//!
//! - [`SqliteRecorder`]: durable log in a single `observations` table keyed by
//!   entity id.
//! - [`MemoryRecorder`]: in-process log for tests and dry runs.

mod memory;
mod sqlite;

use std::fmt;

use thiserror::Error;

use crate::model::{EntityId, Observation};

pub use memory::MemoryRecorder;
pub use sqlite::SqliteRecorder;

/// Identifier of an appended row (auto-incrementing, starts at 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that can occur when writing to or reading from the log.
#[derive(Debug, Error)]
pub enum RecordError {
    /// SQLite reported an error (I/O, full disk, schema mismatch, ...).
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while preparing the storage location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recorder cannot accept writes.
    #[error("Recorder unavailable: {0}")]
    Unavailable(String),
}

/// A row of the observation log.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    /// Row id.
    pub id: RecordId,
    /// Entity id as recorded.
    pub entity: String,
    /// Callsign, if known.
    pub label: Option<String>,
    /// Capture time, formatted with [`crate::model::TIMESTAMP_FORMAT`].
    pub time: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters, if reported.
    pub altitude: Option<f64>,
    /// Whether the position was inside the boundary.
    pub in_boundary: bool,
}

/// Durable, append-only storage for observations.
///
/// Implementations may block on storage I/O; callers treat `append` as a
/// bounded-latency operation.
pub trait ObservationRecorder: Send + Sync {
    /// Append one observation with its membership flag.
    fn append(&self, observation: &Observation, inside: bool) -> Result<RecordId, RecordError>;

    /// All rows for an entity, in append order.
    fn history(&self, entity: &EntityId) -> Result<Vec<StoredObservation>, RecordError>;

    /// Distinct entity ids present in the log, sorted.
    fn entities(&self) -> Result<Vec<String>, RecordError>;

    /// Total number of rows.
    fn count(&self) -> Result<u64, RecordError>;
}
