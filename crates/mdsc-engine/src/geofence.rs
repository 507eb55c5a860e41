//! # Geofence Matching
//!
//! Point-in-polygon containment against published geographies referenced
//! by id. A rule's geography list is OR'd. A reference to a geography that
//! is not in the supplied set contains nothing; it is never an error.

use std::collections::HashMap;

use mdsc_core::geography::Ring;
use mdsc_core::{Geography, GeographyId, Point};

/// Geographies indexed by id for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct GeographyIndex<'a> {
    by_id: HashMap<GeographyId, &'a Geography>,
}

impl<'a> GeographyIndex<'a> {
    /// Index a slice of geographies. Later duplicates of an id win.
    pub fn new(geographies: &'a [Geography]) -> Self {
        Self {
            by_id: geographies.iter().map(|g| (g.geography_id, g)).collect(),
        }
    }

    /// Look up a geography.
    pub fn get(&self, id: &GeographyId) -> Option<&'a Geography> {
        self.by_id.get(id).copied()
    }

    /// Whether the index knows `id`.
    pub fn contains_id(&self, id: &GeographyId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether `point` lies in any of the referenced geographies.
    pub fn point_in_any_geography(&self, point: Point, geography_ids: &[GeographyId]) -> bool {
        geography_ids
            .iter()
            .filter_map(|id| self.get(id))
            .any(|geography| point_in_geography(point, geography))
    }
}

/// Whether `point` lies in any polygon of `geography`.
pub fn point_in_geography(point: Point, geography: &Geography) -> bool {
    geography
        .geography_json
        .polygons()
        .into_iter()
        .any(|rings| point_in_polygon(point, rings))
}

/// Even-odd containment for a polygon given as outer ring plus holes.
pub fn point_in_polygon(point: Point, rings: &[Ring]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    ring_contains(point, outer) && !holes.iter().any(|hole| ring_contains(point, hole))
}

fn ring_contains(point: Point, ring: &Ring) -> bool {
    let vertices: Vec<(f64, f64)> = ring
        .iter()
        .filter_map(|position| match position.as_slice() {
            [lng, lat, ..] => Some((*lng, *lat)),
            _ => None,
        })
        .collect();
    if vertices.len() < 3 {
        return false;
    }

    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdsc_core::geography::Geometry;
    use mdsc_core::GeographyShape;

    fn ring(points: &[(f64, f64)]) -> Ring {
        points.iter().map(|(lng, lat)| vec![*lng, *lat]).collect()
    }

    fn square(min: f64, max: f64) -> Ring {
        ring(&[(min, min), (max, min), (max, max), (min, max), (min, min)])
    }

    fn geography(rings: Vec<Ring>) -> Geography {
        Geography {
            geography_id: GeographyId::new(),
            name: None,
            publish_date: None,
            geography_json: GeographyShape::Geometry(Geometry::Polygon { coordinates: rings }),
        }
    }

    #[test]
    fn point_inside_and_outside_square() {
        let rings = vec![square(0.0, 10.0)];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &rings));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &rings));
        assert!(!point_in_polygon(Point::new(-0.5, 5.0), &rings));
    }

    #[test]
    fn hole_excludes_point() {
        let rings = vec![square(0.0, 10.0), square(4.0, 6.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &rings));
        assert!(point_in_polygon(Point::new(2.0, 2.0), &rings));
    }

    #[test]
    fn concave_polygon() {
        // An L shape: the notch at (7, 7) is outside.
        let l_shape = vec![ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ])];
        assert!(point_in_polygon(Point::new(2.0, 8.0), &l_shape));
        assert!(!point_in_polygon(Point::new(7.0, 7.0), &l_shape));
    }

    #[test]
    fn degenerate_rings_contain_nothing() {
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[ring(&[(0.0, 0.0), (1.0, 1.0)])]));
    }

    #[test]
    fn any_geography_is_ored() {
        let west = geography(vec![square(0.0, 1.0)]);
        let east = geography(vec![square(5.0, 6.0)]);
        let ids = [west.geography_id, east.geography_id];
        let all = vec![west, east];
        let index = GeographyIndex::new(&all);
        assert!(index.point_in_any_geography(Point::new(0.5, 0.5), &ids));
        assert!(index.point_in_any_geography(Point::new(5.5, 5.5), &ids));
        assert!(!index.point_in_any_geography(Point::new(3.0, 3.0), &ids));
    }

    #[test]
    fn missing_geography_is_no_match() {
        let known = geography(vec![square(0.0, 1.0)]);
        let all = vec![known];
        let index = GeographyIndex::new(&all);
        let missing = GeographyId::new();
        assert!(!index.contains_id(&missing));
        assert!(!index.point_in_any_geography(Point::new(0.5, 0.5), &[missing]));
    }

    #[test]
    fn multipolygon_geography() {
        let geography = Geography {
            geography_id: GeographyId::new(),
            name: Some("islands".into()),
            publish_date: None,
            geography_json: GeographyShape::Geometry(Geometry::MultiPolygon {
                coordinates: vec![vec![square(0.0, 1.0)], vec![square(2.0, 3.0)]],
            }),
        };
        assert!(point_in_geography(Point::new(2.5, 2.5), &geography));
        assert!(!point_in_geography(Point::new(1.5, 1.5), &geography));
    }
}
