//! Boundary geometry and the membership oracle.
//!
//! The boundary is a country or region outline loaded once at startup. It is
//! immutable after construction, so a single `Arc<Boundary>` can be queried from
//! any number of threads.
//!
//! # Membership vs. bounding box
//!
//! The bounding box is only a hint for narrowing the upstream telemetry query.
//! Membership is always decided against the full polygon: near the corners of a
//! concave outline the box would report aircraft that are not actually inside.
//!
//! # Example
//!
//! ```ignore
//! use airfence::boundary::{Boundary, MembershipOracle};
//! use airfence::geo_bounds::Position;
//!
//! let boundary = Boundary::load("gadm41_UKR_0.shp")?;
//! let kyiv = Position::new(50.45, 30.52);
//! assert!(boundary.contains(kyiv));
//! ```

mod error;
mod geojson;
mod shp;

use std::path::Path;

use geo::line_intersection::line_intersection;
use geo::{Area, BoundingRect, Contains, Line, LineString, MultiPolygon, Point, Polygon};
use tracing::{debug, info};

use crate::geo_bounds::{GeoBounds, Position};

pub use error::GeometryLoadError;
pub use geojson::parse_geojson;
pub use shp::read_shapefile;

/// Rings with more segments than this skip the self-intersection check.
///
/// The check is quadratic; national outlines with hundreds of thousands of
/// vertices would stall startup.
pub const MAX_VALIDATED_RING_SEGMENTS: usize = 20_000;

/// Answers "is this position inside the boundary?".
///
/// Implementations must be deterministic, side-effect free, and must return
/// `false` (never panic) for positions that are not valid WGS84 coordinates.
pub trait MembershipOracle: Send + Sync {
    /// Whether the position lies strictly inside the boundary.
    fn contains(&self, position: Position) -> bool;
}

/// A validated boundary geometry with its bounding box.
#[derive(Debug, Clone)]
pub struct Boundary {
    geometry: MultiPolygon<f64>,
    bounds: GeoBounds,
}

impl Boundary {
    /// Load a boundary from a GeoJSON file (`.geojson` or `.json`) or an ESRI
    /// shapefile (`.shp`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeometryLoadError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let boundary = match extension.as_deref() {
            Some("geojson") | Some("json") => {
                let text =
                    std::fs::read_to_string(path).map_err(|source| GeometryLoadError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_geojson_str(&text)?
            }
            Some("shp") => Self::new(read_shapefile(path)?)?,
            _ => return Err(GeometryLoadError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(
            path = %path.display(),
            polygons = boundary.polygon_count(),
            vertices = boundary.vertex_count(),
            bounds = %boundary.bounds,
            "Boundary loaded"
        );
        Ok(boundary)
    }

    /// Parse and validate GeoJSON text.
    pub fn from_geojson_str(text: &str) -> Result<Self, GeometryLoadError> {
        Self::new(parse_geojson(text)?)
    }

    /// Build a boundary from a single polygon.
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self, GeometryLoadError> {
        Self::new(MultiPolygon::new(vec![polygon]))
    }

    /// Validate a multipolygon and compute its bounding box.
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self, GeometryLoadError> {
        if geometry.0.is_empty() {
            return Err(GeometryLoadError::Empty);
        }

        for (index, polygon) in geometry.0.iter().enumerate() {
            validate_polygon(index, polygon)?;
        }

        let rect = geometry.bounding_rect().ok_or(GeometryLoadError::Empty)?;
        let bounds = GeoBounds::new(rect.min().y, rect.max().y, rect.min().x, rect.max().x);

        Ok(Self { geometry, bounds })
    }

    /// Bounding box of the geometry.
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    /// Underlying geometry (x = longitude, y = latitude).
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Number of polygons.
    pub fn polygon_count(&self) -> usize {
        self.geometry.0.len()
    }

    /// Total number of ring vertices.
    pub fn vertex_count(&self) -> usize {
        self.geometry
            .0
            .iter()
            .map(|p| {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            })
            .sum()
    }
}

impl MembershipOracle for Boundary {
    fn contains(&self, position: Position) -> bool {
        if !position.is_valid() || !self.bounds.contains(position) {
            return false;
        }
        let point = Point::new(position.longitude, position.latitude);
        self.geometry.contains(&point)
    }
}

fn validate_polygon(index: usize, polygon: &Polygon<f64>) -> Result<(), GeometryLoadError> {
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());

    for (ring_index, ring) in rings.enumerate() {
        // Polygon::new closes rings, so a triangle has four coordinates.
        if ring.0.len() < 4 {
            return Err(GeometryLoadError::InvalidRing {
                polygon: index,
                reason: format!(
                    "ring {} has fewer than three distinct vertices",
                    ring_index
                ),
            });
        }

        for coord in &ring.0 {
            if !Position::new(coord.y, coord.x).is_valid() {
                return Err(GeometryLoadError::CoordinateOutOfRange {
                    lon: coord.x,
                    lat: coord.y,
                });
            }
        }

        if ring_self_intersects(ring) {
            return Err(GeometryLoadError::SelfIntersection {
                polygon: index,
                ring: ring_index,
            });
        }
    }

    if polygon.unsigned_area() <= 0.0 {
        return Err(GeometryLoadError::InvalidRing {
            polygon: index,
            reason: "exterior ring has zero area".to_string(),
        });
    }

    Ok(())
}

/// Whether two non-adjacent segments of a closed ring touch or cross.
fn ring_self_intersects(ring: &LineString<f64>) -> bool {
    let lines: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = lines.len();

    if n > MAX_VALIDATED_RING_SEGMENTS {
        debug!(segments = n, "Skipping self-intersection check for large ring");
        return false;
    }

    for i in 0..n {
        for j in (i + 2)..n {
            // First and last segments share the closing vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            if !boxes_overlap(&lines[i], &lines[j]) {
                continue;
            }
            if line_intersection(lines[i], lines[j]).is_some() {
                return true;
            }
        }
    }
    false
}

fn boxes_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    let (a_min_x, a_max_x) = min_max(a.start.x, a.end.x);
    let (a_min_y, a_max_y) = min_max(a.start.y, a.end.y);
    let (b_min_x, b_max_x) = min_max(b.start.x, b.end.x);
    let (b_min_y, b_max_y) = min_max(b.start.y, b.end.y);
    a_min_x <= b_max_x && b_min_x <= a_max_x && a_min_y <= b_max_y && b_min_y <= a_max_y
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
