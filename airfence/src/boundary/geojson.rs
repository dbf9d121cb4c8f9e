//! GeoJSON boundary parsing.
//!
//! Accepts a `FeatureCollection`, a single `Feature`, or a bare `Polygon` /
//! `MultiPolygon` geometry. All polygons found are merged into one
//! `MultiPolygon`. Positions are `[longitude, latitude, (altitude)]`; any
//! third ordinate is ignored.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;

use super::error::GeometryLoadError;

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Parse GeoJSON text into a multipolygon.
pub fn parse_geojson(text: &str) -> Result<MultiPolygon<f64>, GeometryLoadError> {
    let root: Value = serde_json::from_str(text).map_err(parse_error)?;
    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| GeometryLoadError::Parse("missing 'type' member".to_string()))?;

    let geometries: Vec<Geometry> = match kind.as_str() {
        "FeatureCollection" => {
            let collection: FeatureCollection =
                serde_json::from_value(root).map_err(parse_error)?;
            collection
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .collect()
        }
        "Feature" => {
            let feature: Feature = serde_json::from_value(root).map_err(parse_error)?;
            feature.geometry.into_iter().collect()
        }
        _ => vec![serde_json::from_value(root).map_err(parse_error)?],
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        polygons.extend(geometry_polygons(&geometry)?);
    }

    if polygons.is_empty() {
        return Err(GeometryLoadError::Empty);
    }
    Ok(MultiPolygon::new(polygons))
}

fn parse_error(e: serde_json::Error) -> GeometryLoadError {
    GeometryLoadError::Parse(e.to_string())
}

fn geometry_polygons(geometry: &Geometry) -> Result<Vec<Polygon<f64>>, GeometryLoadError> {
    match geometry.kind.as_str() {
        "Polygon" => Ok(vec![polygon_from_value(&geometry.coordinates)?]),
        "MultiPolygon" => as_array(&geometry.coordinates, "MultiPolygon coordinates")?
            .iter()
            .map(polygon_from_value)
            .collect(),
        other => Err(GeometryLoadError::UnsupportedGeometry(other.to_string())),
    }
}

fn polygon_from_value(value: &Value) -> Result<Polygon<f64>, GeometryLoadError> {
    let rings = as_array(value, "polygon rings")?;
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| GeometryLoadError::Parse("polygon has no rings".to_string()))?;

    let exterior = ring_from_value(exterior)?;
    let interiors = interiors
        .iter()
        .map(ring_from_value)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_value(value: &Value) -> Result<LineString<f64>, GeometryLoadError> {
    let coords = as_array(value, "ring positions")?
        .iter()
        .map(coord_from_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn coord_from_value(value: &Value) -> Result<Coord<f64>, GeometryLoadError> {
    let position = as_array(value, "position")?;
    match (
        position.first().and_then(Value::as_f64),
        position.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(GeometryLoadError::Parse(format!(
            "position must contain two numbers, got {}",
            value
        ))),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, GeometryLoadError> {
    value
        .as_array()
        .ok_or_else(|| GeometryLoadError::Parse(format!("expected array of {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "Polygon",
        "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
    }"#;

    #[test]
    fn test_bare_polygon() {
        let mp = parse_geojson(SQUARE).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
    }

    #[test]
    fn test_feature_collection_merges_polygons() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"NAME_0": "A"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiPolygon",
                              "coordinates": [[[[5,5],[6,5],[6,6],[5,6],[5,5]]],
                                              [[[8,8],[9,8],[9,9],[8,9],[8,8]]]]}}
            ]
        }"#;
        let mp = parse_geojson(text).unwrap();
        assert_eq!(mp.0.len(), 3);
    }

    #[test]
    fn test_feature_with_hole_and_altitude() {
        let text = r#"{
            "type": "Feature",
            "properties": null,
            "geometry": {"type": "Polygon", "coordinates": [
                [[0,0,100],[10,0,100],[10,10,100],[0,10,100],[0,0,100]],
                [[4,4],[6,4],[6,6],[4,6],[4,4]]
            ]}
        }"#;
        let mp = parse_geojson(text).unwrap();
        assert_eq!(mp.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_rejects_point_geometry() {
        let text = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(matches!(
            parse_geojson(text),
            Err(GeometryLoadError::UnsupportedGeometry(kind)) if kind == "Point"
        ));
    }

    #[test]
    fn test_rejects_empty_collection() {
        let text = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(parse_geojson(text), Err(GeometryLoadError::Empty)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            parse_geojson("{not json"),
            Err(GeometryLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_non_numeric_position() {
        let text = r#"{"type": "Polygon", "coordinates": [[["a", 0], [1, 0], [1, 1], ["a", 0]]]}"#;
        assert!(matches!(parse_geojson(text), Err(GeometryLoadError::Parse(_))));
    }
}
