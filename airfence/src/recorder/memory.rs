//! In-memory observation log.

use parking_lot::Mutex;

use super::{ObservationRecorder, RecordError, RecordId, StoredObservation};
use crate::model::{format_timestamp, EntityId, Observation};

/// Observation log kept in process memory.
///
/// Used for tests and for `--dry-run` sessions that should not touch disk.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    rows: Mutex<Vec<StoredObservation>>,
}

impl MemoryRecorder {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row, in append order.
    pub fn rows(&self) -> Vec<StoredObservation> {
        self.rows.lock().clone()
    }
}

impl ObservationRecorder for MemoryRecorder {
    fn append(&self, observation: &Observation, inside: bool) -> Result<RecordId, RecordError> {
        let mut rows = self.rows.lock();
        let id = RecordId(rows.len() as i64 + 1);
        rows.push(StoredObservation {
            id,
            entity: observation.entity.to_string(),
            label: observation.label.clone(),
            time: format_timestamp(&observation.timestamp),
            latitude: observation.position.latitude,
            longitude: observation.position.longitude,
            altitude: observation.altitude,
            in_boundary: inside,
        });
        Ok(id)
    }

    fn history(&self, entity: &EntityId) -> Result<Vec<StoredObservation>, RecordError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.entity == entity.as_str())
            .cloned()
            .collect())
    }

    fn entities(&self) -> Result<Vec<String>, RecordError> {
        let mut ids: Vec<String> = self.rows.lock().iter().map(|r| r.entity.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn count(&self) -> Result<u64, RecordError> {
        Ok(self.rows.lock().len() as u64)
    }
}
