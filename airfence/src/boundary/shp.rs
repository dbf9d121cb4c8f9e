//! ESRI shapefile boundary reader.
//!
//! Only the `.shp` geometry file is read; the `.dbf` attribute table that
//! usually sits next to it (GADM ships one per level) is not needed to decide
//! membership. Every Polygon, PolygonM and PolygonZ record contributes its
//! rings; measures and elevations are dropped. Null records are skipped.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{Geometry, MultiPolygon, Polygon};
use shapefile::{Shape, ShapeReader};
use tracing::debug;

use super::GeometryLoadError;

/// Read every polygon record of a `.shp` file.
pub fn read_shapefile(path: &Path) -> Result<MultiPolygon<f64>, GeometryLoadError> {
    let file = File::open(path).map_err(|source| GeometryLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let shapes = ShapeReader::new(BufReader::new(file))
        .and_then(|reader| reader.read())
        .map_err(|e| GeometryLoadError::Shapefile(e.to_string()))?;

    polygons_from_shapes(shapes)
}

fn polygons_from_shapes(shapes: Vec<Shape>) -> Result<MultiPolygon<f64>, GeometryLoadError> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut nulls = 0usize;

    for shape in shapes {
        if let Shape::NullShape = shape {
            nulls += 1;
            continue;
        }

        let kind = format!("{:?}", shape.shapetype());
        let geometry = Geometry::<f64>::try_from(shape)
            .map_err(|e| GeometryLoadError::Shapefile(e.to_string()))?;

        match geometry {
            Geometry::MultiPolygon(multi) => polygons.extend(multi.0),
            Geometry::Polygon(polygon) => polygons.push(polygon),
            _ => return Err(GeometryLoadError::UnsupportedGeometry(kind)),
        }
    }

    if nulls > 0 {
        debug!(nulls, "Skipped null shapefile records");
    }

    Ok(MultiPolygon::new(polygons))
}
