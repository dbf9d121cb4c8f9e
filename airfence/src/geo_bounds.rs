//! Geographic primitives shared by the boundary, feed and engine.
//!
//! Coordinates are WGS84 degrees. Latitude comes first everywhere in this
//! crate's public API; conversion to the x/y (longitude/latitude) order used by
//! the geometry library happens inside [`crate::boundary`].

use std::fmt;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Position {
    /// Create a new position.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Geographic bounding box.
///
/// The boundary keeps one of these as a pre-filter for the upstream telemetry
/// query. It is never used as a membership test on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Whether a position falls inside the box (edges inclusive).
    pub fn contains(&self, position: Position) -> bool {
        position.latitude >= self.min_lat
            && position.latitude <= self.max_lat
            && position.longitude >= self.min_lon
            && position.longitude <= self.max_lon
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat {:.4}..{:.4}, lon {:.4}..{:.4}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
