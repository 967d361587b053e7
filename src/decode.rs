//! Decoding of textual geometries into join input collections.
//!
//! Records that fail to decode are skipped with a warning; a collection with
//! holes is a valid join input.

use crate::error::{JoinError, Result};
use crate::join::GeometryMap;
use geo::Geometry;
use geozero::ToGeo;
use geozero::wkt::Wkt;

/// Textual geometry encodings accepted by [`parse_geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryFormat {
    #[default]
    Wkt,
    GeoJson,
}

/// Decode a single geometry.
///
/// ```
/// use topolink::decode::{GeometryFormat, parse_geometry};
///
/// let g = parse_geometry("POLYGON((0 0, 2 0, 2 2, 0 2, 0 0))", GeometryFormat::Wkt).unwrap();
/// assert!(matches!(g, geo::Geometry::Polygon(_)));
///
/// assert!(parse_geometry("POLYGON((0 0, 2 0", GeometryFormat::Wkt).is_err());
/// ```
pub fn parse_geometry(text: &str, format: GeometryFormat) -> Result<Geometry> {
    match format {
        GeometryFormat::Wkt => Wkt(text.trim())
            .to_geo()
            .map_err(|e| JoinError::Decode(format!("Failed to parse WKT: {}", e))),
        GeometryFormat::GeoJson => {
            let geom: geojson::Geometry = serde_json::from_str(text)
                .map_err(|e| JoinError::Decode(format!("Failed to parse GeoJSON: {}", e)))?;
            Geometry::try_from(geom)
                .map_err(|e| JoinError::Decode(format!("Unsupported GeoJSON geometry: {}", e)))
        }
    }
}

/// Build a join input from `(id, text)` records, skipping malformed ones.
///
/// Later records win over earlier ones with the same id.
pub fn decode_collection<I, K, V>(records: I, format: GeometryFormat) -> GeometryMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let mut collection = GeometryMap::default();
    for (id, text) in records {
        let id = id.into();
        match parse_geometry(text.as_ref(), format) {
            Ok(geometry) => {
                collection.insert(id, geometry);
            }
            Err(e) => log::warn!("Skipping malformed geometry at {}: {}", id, e),
        }
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wkt_kinds() {
        let point = parse_geometry("POINT(1 2)", GeometryFormat::Wkt).unwrap();
        assert!(matches!(point, Geometry::Point(_)));

        let line = parse_geometry(" LINESTRING(0 0, 1 1) ", GeometryFormat::Wkt).unwrap();
        assert!(matches!(line, Geometry::LineString(_)));

        let multi = parse_geometry(
            "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))",
            GeometryFormat::Wkt,
        )
        .unwrap();
        assert!(matches!(multi, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_parse_geojson() {
        let g = parse_geometry(
            r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#,
            GeometryFormat::GeoJson,
        )
        .unwrap();
        assert!(matches!(g, Geometry::Polygon(_)));
        assert!(parse_geometry("{\"type\": \"Polygon\"}", GeometryFormat::GeoJson).is_err());
    }

    #[test]
    fn test_decode_collection_skips_malformed() {
        let records = vec![
            ("a", "POINT(0 0)"),
            ("b", "POINT(0"),
            ("c", "not a geometry"),
            ("d", "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"),
        ];
        let collection = decode_collection(records, GeometryFormat::Wkt);
        assert_eq!(collection.len(), 2);
        assert!(collection.contains_key("a"));
        assert!(collection.contains_key("d"));
        assert!(!collection.contains_key("b"));
    }
}
