//! Boundary loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating the boundary geometry.
///
/// All of these are fatal at startup: the tracker cannot run without a
/// boundary.
#[derive(Debug, Error)]
pub enum GeometryLoadError {
    /// The boundary file could not be read.
    #[error("Failed to read boundary file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file extension is not a supported geometry format.
    #[error("Unsupported boundary format: {0} (expected .geojson, .json or .shp)")]
    UnsupportedFormat(PathBuf),

    /// The file is not valid JSON or not valid GeoJSON.
    #[error("Invalid GeoJSON: {0}")]
    Parse(String),

    /// The shapefile header or a record could not be decoded.
    #[error("Invalid shapefile: {0}")]
    Shapefile(String),

    /// The file contains a geometry that has no area.
    #[error("Unsupported geometry type '{0}' (expected Polygon or MultiPolygon)")]
    UnsupportedGeometry(String),

    /// No polygons were found.
    #[error("Boundary contains no polygons")]
    Empty,

    /// A ring is too short or has zero area.
    #[error("Invalid ring in polygon {polygon}: {reason}")]
    InvalidRing { polygon: usize, reason: String },

    /// A vertex lies outside the WGS84 range or is not finite.
    #[error("Coordinate out of range: lon {lon}, lat {lat}")]
    CoordinateOutOfRange { lon: f64, lat: f64 },

    /// A ring crosses itself.
    #[error("Ring {ring} of polygon {polygon} is self-intersecting")]
    SelfIntersection { polygon: usize, ring: usize },
}
