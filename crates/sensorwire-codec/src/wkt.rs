//! Minimal WKT reader for polygon payloads.
//!
//! Spatial columns come back from the database as WKT text. Only `POLYGON`
//! (with an optional `Z`, `M` or `ZM` tag) is understood; everything else
//! returns `None` and is left to the caller's fallbacks.

use sensorwire_types::Geometry;

const POLYGON: &str = "POLYGON";
const DIMENSION_TAGS: [&str; 3] = ["ZM", "Z", "M"];

/// Parse a WKT `POLYGON`.
pub fn parse_polygon(text: &str) -> Option<Geometry> {
    let trimmed = text.trim();
    if !trimmed.get(..POLYGON.len())?.eq_ignore_ascii_case(POLYGON) {
        return None;
    }
    let mut body = trimmed.get(POLYGON.len()..)?.trim_start();
    for tag in DIMENSION_TAGS {
        if body
            .get(..tag.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(tag))
        {
            body = body.get(tag.len()..)?.trim_start();
            break;
        }
    }

    let mut rest = body.strip_prefix('(')?.strip_suffix(')')?.trim();
    let mut rings = Vec::new();
    while !rest.is_empty() {
        let (ring, after) = rest.strip_prefix('(')?.split_once(')')?;
        rings.push(parse_ring(ring)?);
        let after = after.trim_start();
        rest = after.strip_prefix(',').unwrap_or(after).trim_start();
    }
    if rings.is_empty() {
        return None;
    }
    Some(Geometry::Polygon { coordinates: rings })
}

fn parse_ring(text: &str) -> Option<Vec<Vec<f64>>> {
    let positions = text
        .split(',')
        .map(parse_position)
        .collect::<Option<Vec<_>>>()?;
    // A linear ring needs at least four positions.
    (positions.len() >= 4).then_some(positions)
}

fn parse_position(text: &str) -> Option<Vec<f64>> {
    let coords = text
        .split_whitespace()
        .map(|c| c.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    (2..=4).contains(&coords.len()).then_some(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygon_with_hole() {
        let wkt = "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 3 2, 3 3, 2 2))";
        let Some(Geometry::Polygon { coordinates }) = parse_polygon(wkt) else {
            panic!("expected a polygon");
        };
        assert_eq!(coordinates.len(), 2);
        assert_eq!(coordinates.first().map(Vec::len), Some(5));
        assert_eq!(
            coordinates.first().and_then(|r| r.get(1)),
            Some(&vec![10.0, 0.0])
        );
    }

    #[test]
    fn accepts_dimension_tag_and_lowercase() {
        let wkt = "polygon z ((0 0 1, 1 0 1, 1 1 1, 0 0 1))";
        assert!(parse_polygon(wkt).is_some());
    }

    #[test]
    fn rejects_other_geometries() {
        assert_eq!(parse_polygon("POINT (1 2)"), None);
        assert_eq!(parse_polygon("POLYGON EMPTY"), None);
        assert_eq!(parse_polygon("POLYGON ((0 0, 1 1))"), None);
        assert_eq!(parse_polygon("POLY"), None);
    }
}
