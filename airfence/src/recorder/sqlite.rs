//! SQLite observation log.
//!
//! All entities share one `observations` table with an index on the entity
//! column. Entity ids are always bound as parameters; no SQL identifier is ever
//! derived from feed data.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use super::{ObservationRecorder, RecordError, RecordId, StoredObservation};
use crate::model::{format_timestamp, EntityId, Observation};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        callsign TEXT,
        time TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        altitude REAL,
        icao24 TEXT NOT NULL,
        in_boundary INTEGER NOT NULL CHECK (in_boundary IN (0, 1))
    );
    CREATE INDEX IF NOT EXISTS idx_observations_icao24 ON observations(icao24, id);
";

const SELECT_COLUMNS: &str =
    "SELECT id, icao24, callsign, time, latitude, longitude, altitude, in_boundary FROM observations";

/// Durable observation log backed by SQLite.
pub struct SqliteRecorder {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecorder").finish_non_exhaustive()
    }
}

impl SqliteRecorder {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        let recorder = Self::with_connection(conn)?;
        info!(path = %path.display(), "Observation log opened");
        Ok(recorder)
    }

    /// Create a log that lives only as long as this value.
    pub fn in_memory() -> Result<Self, RecordError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RecordError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredObservation> {
        Ok(StoredObservation {
            id: RecordId(row.get(0)?),
            entity: row.get(1)?,
            label: row.get(2)?,
            time: row.get(3)?,
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            altitude: row.get(6)?,
            in_boundary: row.get::<_, i64>(7)? != 0,
        })
    }
}

impl ObservationRecorder for SqliteRecorder {
    fn append(&self, observation: &Observation, inside: bool) -> Result<RecordId, RecordError> {
        let conn = self.conn.lock();
        let time = format_timestamp(&observation.timestamp);

        conn.execute(
            "INSERT INTO observations
             (callsign, time, latitude, longitude, altitude, icao24, in_boundary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                observation.label,
                time,
                observation.position.latitude,
                observation.position.longitude,
                observation.altitude,
                observation.entity.as_str(),
                inside as i64,
            ],
        )?;

        let id = RecordId(conn.last_insert_rowid());
        debug!(
            entity = %observation.entity,
            label = observation.display_label(),
            time = %time,
            record = %id,
            "New data entered"
        );
        Ok(id)
    }

    fn history(&self, entity: &EntityId) -> Result<Vec<StoredObservation>, RecordError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} WHERE icao24 = ?1 ORDER BY id", SELECT_COLUMNS))?;
        let rows = stmt.query_map(params![entity.as_str()], Self::row_to_stored)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn entities(&self) -> Result<Vec<String>, RecordError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT icao24 FROM observations ORDER BY icao24")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn count(&self) -> Result<u64, RecordError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_bounds::Position;
    use chrono::{TimeZone, Utc};

    fn obs(entity: &str, label: &str, secs: i64) -> Observation {
        Observation::new(
            EntityId::new(entity).unwrap(),
            Position::new(50.4501, 30.5234),
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        )
        .unwrap()
        .with_label(label)
        .with_altitude(Some(10_668.0))
    }

    #[test]
    fn test_append_and_read_back() {
        let recorder = SqliteRecorder::in_memory().unwrap();
        let id = recorder.append(&obs("508c5e", "AUI101 ", 0), true).unwrap();
        assert_eq!(id, RecordId(1));

        let history = recorder.history(&EntityId::new("508c5e").unwrap()).unwrap();
        assert_eq!(history.len(), 1);
        let row = &history[0];
        assert_eq!(row.entity, "508c5e");
        assert_eq!(row.label.as_deref(), Some("AUI101"));
        assert_eq!(row.time, "2023-11-14 22:13:20");
        assert!((row.latitude - 50.4501).abs() < 1e-9);
        assert_eq!(row.altitude, Some(10_668.0));
        assert!(row.in_boundary);
    }

    #[test]
    fn test_missing_label_and_altitude_stored_as_null() {
        let recorder = SqliteRecorder::in_memory().unwrap();
        let observation = Observation::new(
            EntityId::new("abc123").unwrap(),
            Position::new(1.0, 2.0),
            Utc.timestamp_opt(0, 0).unwrap(),
        )
        .unwrap();
        recorder.append(&observation, false).unwrap();

        let row = &recorder.history(&observation.entity).unwrap()[0];
        assert_eq!(row.label, None);
        assert_eq!(row.altitude, None);
        assert!(!row.in_boundary);
    }

    #[test]
    fn test_hostile_entity_id_is_just_data() {
        let recorder = SqliteRecorder::in_memory().unwrap();
        let hostile = "x; DROP TABLE observations;--";
        recorder.append(&obs(hostile, "EVIL", 0), false).unwrap();
        recorder.append(&obs("a1", "OK", 0), false).unwrap();

        assert_eq!(recorder.count().unwrap(), 2);
        let history = recorder.history(&EntityId::new(hostile).unwrap()).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_entities_are_distinct_and_sorted() {
        let recorder = SqliteRecorder::in_memory().unwrap();
        for (entity, secs) in [("c3", 0), ("a1", 0), ("c3", 10), ("b2", 0)] {
            recorder.append(&obs(entity, "", secs), false).unwrap();
        }
        assert_eq!(recorder.entities().unwrap(), vec!["a1", "b2", "c3"]);
    }

    #[test]
    fn test_open_creates_parent_directories_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("positions.db");

        {
            let recorder = SqliteRecorder::open(&path).unwrap();
            recorder.append(&obs("a1", "X", 0), true).unwrap();
            recorder.append(&obs("a1", "X", 60), false).unwrap();
        }

        let reopened = SqliteRecorder::open(&path).unwrap();
        let history = reopened.history(&EntityId::new("a1").unwrap()).unwrap();
        let ids: Vec<i64> = history.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2]);

        // Ids keep growing after reopening.
        let next = reopened.append(&obs("a1", "X", 120), true).unwrap();
        assert_eq!(next, RecordId(3));
    }

    #[test]
    fn test_open_fails_for_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqliteRecorder::open(dir.path()).is_err());
    }
}
