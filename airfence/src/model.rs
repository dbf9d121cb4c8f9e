//! Core data types for boundary tracking.
//!
//! Types here describe what the feed reported (observations) and what the
//! tracker derived from it (membership and transitions).

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::geo_bounds::Position;

/// Timestamp format used in logs and in the persisted observation log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way it is persisted.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Reasons a raw telemetry entry cannot become an [`Observation`].
///
/// These never reach the engine; the feed filters them out and counts them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObservationError {
    /// The entity identifier was empty after trimming.
    #[error("Empty entity id")]
    EmptyEntityId,

    /// Latitude or longitude was absent.
    #[error("Missing position for {0}")]
    MissingPosition(String),

    /// Latitude or longitude was outside the WGS84 range.
    #[error("Position out of range for {entity}: {latitude}, {longitude}")]
    PositionOutOfRange {
        entity: String,
        latitude: f64,
        longitude: f64,
    },
}

/// Stable identifier of a tracked aircraft (ICAO 24-bit address in hex).
///
/// Identifiers are trimmed and lower-cased so "4B1805 " and "4b1805" refer to
/// the same aircraft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Normalize and wrap an identifier.
    pub fn new(raw: &str) -> Result<Self, ObservationError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ObservationError::EmptyEntityId);
        }
        Ok(Self(normalized))
    }

    /// The normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One telemetry sample with a valid position.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Aircraft identifier.
    pub entity: EntityId,
    /// Display label (callsign). `None` when blank or unknown.
    pub label: Option<String>,
    /// Reported position.
    pub position: Position,
    /// Barometric altitude in meters, if reported.
    pub altitude: Option<f64>,
    /// Capture time of the sample.
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Create an observation, rejecting out-of-range coordinates.
    pub fn new(
        entity: EntityId,
        position: Position,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ObservationError> {
        if !position.is_valid() {
            return Err(ObservationError::PositionOutOfRange {
                entity: entity.to_string(),
                latitude: position.latitude,
                longitude: position.longitude,
            });
        }

        Ok(Self {
            entity,
            label: None,
            position,
            altitude: None,
            timestamp,
        })
    }

    /// Set the label. Blank labels are stored as `None`.
    pub fn with_label(mut self, label: impl AsRef<str>) -> Self {
        let trimmed = label.as_ref().trim();
        self.label = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Set the altitude.
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude.filter(|a| a.is_finite());
        self
    }

    /// Label for display, falling back to "unknown".
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("unknown")
    }
}

/// Boundary membership of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Membership {
    /// No observation seen yet (or the last one expired).
    #[default]
    Unknown,
    /// Last observation was inside the boundary.
    Inside,
    /// Last observation was outside the boundary.
    Outside,
}

impl Membership {
    /// Membership for a computed containment flag.
    pub fn from_inside(inside: bool) -> Self {
        if inside {
            Membership::Inside
        } else {
            Membership::Outside
        }
    }

    /// Persisted flag (1 inside, 0 outside), `None` for Unknown.
    pub fn as_flag(&self) -> Option<u8> {
        match self {
            Membership::Unknown => None,
            Membership::Inside => Some(1),
            Membership::Outside => Some(0),
        }
    }

    /// Whether the state is known.
    pub fn is_known(&self) -> bool {
        !matches!(self, Membership::Unknown)
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Membership::Unknown => "unknown",
            Membership::Inside => "inside",
            Membership::Outside => "outside",
        };
        f.write_str(text)
    }
}

/// Direction of a boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Outside → Inside.
    Entered,
    /// Inside → Outside.
    Left,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Entered => f.write_str("Entered"),
            Direction::Left => f.write_str("Left"),
        }
    }
}

/// A change of membership between two consecutive observations of one entity.
///
/// Only produced between two known states; a first sighting is never a
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    /// Aircraft identifier.
    pub entity: EntityId,
    /// Label from the observation that caused the transition.
    pub label: Option<String>,
    /// State before the observation.
    pub previous: Membership,
    /// State after the observation.
    pub current: Membership,
    /// Timestamp of the observation.
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    /// Crossing direction.
    pub fn direction(&self) -> Direction {
        match self.current {
            Membership::Inside => Direction::Entered,
            _ => Direction::Left,
        }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} boundary: {} | {} at {}",
            self.direction(),
            self.entity,
            self.label.as_deref().unwrap_or("unknown"),
            format_timestamp(&self.timestamp)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    mod entity_id {
        use super::*;

        #[test]
        fn test_normalizes_case_and_whitespace() {
            let id = EntityId::new("  4B1805 ").unwrap();
            assert_eq!(id.as_str(), "4b1805");
            assert_eq!(id, EntityId::new("4b1805").unwrap());
        }

        #[test]
        fn test_rejects_empty() {
            assert_eq!(EntityId::new("   "), Err(ObservationError::EmptyEntityId));
        }

        #[test]
        fn test_unsafe_characters_are_kept_verbatim() {
            // Identifiers are only ever bound as SQL parameters, never spliced.
            let id = EntityId::new("a1\"; DROP TABLE x;--").unwrap();
            assert_eq!(id.as_str(), "a1\"; drop table x;--");
        }
    }

    mod observation {
        use super::*;

        #[test]
        fn test_rejects_out_of_range_position() {
            let id = EntityId::new("abc123").unwrap();
            let result = Observation::new(id, Position::new(91.0, 0.0), ts());
            assert!(matches!(
                result,
                Err(ObservationError::PositionOutOfRange { .. })
            ));
        }

        #[test]
        fn test_blank_label_becomes_none() {
            let id = EntityId::new("abc123").unwrap();
            let obs = Observation::new(id, Position::new(50.0, 30.0), ts())
                .unwrap()
                .with_label("        ");
            assert_eq!(obs.label, None);
            assert_eq!(obs.display_label(), "unknown");
        }

        #[test]
        fn test_label_is_trimmed() {
            let id = EntityId::new("abc123").unwrap();
            let obs = Observation::new(id, Position::new(50.0, 30.0), ts())
                .unwrap()
                .with_label("AUA123  ");
            assert_eq!(obs.label.as_deref(), Some("AUA123"));
        }

        #[test]
        fn test_non_finite_altitude_dropped() {
            let id = EntityId::new("abc123").unwrap();
            let obs = Observation::new(id, Position::new(50.0, 30.0), ts())
                .unwrap()
                .with_altitude(Some(f64::NAN));
            assert_eq!(obs.altitude, None);
        }
    }

    mod membership {
        use super::*;

        #[test]
        fn test_flags() {
            assert_eq!(Membership::Inside.as_flag(), Some(1));
            assert_eq!(Membership::Outside.as_flag(), Some(0));
            assert_eq!(Membership::Unknown.as_flag(), None);
        }

        #[test]
        fn test_from_inside() {
            assert_eq!(Membership::from_inside(true), Membership::Inside);
            assert_eq!(Membership::from_inside(false), Membership::Outside);
            assert!(!Membership::default().is_known());
        }
    }

    mod transition_event {
        use super::*;

        #[test]
        fn test_display_entered() {
            let event = TransitionEvent {
                entity: EntityId::new("4b1805").unwrap(),
                label: Some("SWR12".to_string()),
                previous: Membership::Outside,
                current: Membership::Inside,
                timestamp: ts(),
            };
            assert_eq!(event.direction(), Direction::Entered);
            assert_eq!(
                event.to_string(),
                "Entered boundary: 4b1805 | SWR12 at 2024-03-01 12:30:00"
            );
        }

        #[test]
        fn test_display_left_without_label() {
            let event = TransitionEvent {
                entity: EntityId::new("4b1805").unwrap(),
                label: None,
                previous: Membership::Inside,
                current: Membership::Outside,
                timestamp: ts(),
            };
            assert_eq!(event.direction(), Direction::Left);
            assert!(event.to_string().starts_with("Left boundary: 4b1805 | unknown"));
        }
    }
}
