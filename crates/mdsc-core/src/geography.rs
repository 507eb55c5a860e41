//! # Geographies
//!
//! A published geography is an immutable, pre-built GeoJSON shape referenced
//! by id from policy rules. Only areal geometry is meaningful for
//! containment; any other geometry decodes but contains nothing.

use serde::{Deserialize, Serialize};

use crate::identity::GeographyId;
use crate::temporal::Timestamp;

/// A `[lng, lat]` GeoJSON position. Extra ordinates (altitude) are kept
/// verbatim and ignored by containment.
pub type Position = Vec<f64>;

/// A closed ring of positions. The first ring of a polygon is its outer
/// boundary; the rest are holes.
pub type Ring = Vec<Position>;

/// Geometry objects understood by geofencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
}

/// A GeoJSON feature. `properties` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

/// Any GeoJSON document a geography may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeographyShape {
    FeatureCollection(FeatureCollection),
    Feature(TaggedFeature),
    Geometry(Geometry),
}

/// `{"type": "FeatureCollection", "features": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: FeatureCollectionTag,
    pub features: Vec<Feature>,
}

/// `{"type": "Feature", "geometry": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedFeature {
    #[serde(rename = "type")]
    pub kind: FeatureTag,
    #[serde(flatten)]
    pub feature: Feature,
}

/// Literal `"FeatureCollection"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionTag {
    FeatureCollection,
}

/// Literal `"Feature"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    Feature,
}

impl GeographyShape {
    /// Every polygon in the shape, as a list of rings.
    pub fn polygons(&self) -> Vec<&[Ring]> {
        fn from_geometry<'a>(geometry: &'a Geometry, out: &mut Vec<&'a [Ring]>) {
            match geometry {
                Geometry::Polygon { coordinates } => out.push(coordinates.as_slice()),
                Geometry::MultiPolygon { coordinates } => {
                    out.extend(coordinates.iter().map(Vec::as_slice))
                }
                Geometry::Point { .. } | Geometry::LineString { .. } => {}
            }
        }

        let mut out = Vec::new();
        match self {
            Self::FeatureCollection(collection) => {
                for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
                    from_geometry(geometry, &mut out);
                }
            }
            Self::Feature(tagged) => {
                if let Some(geometry) = &tagged.feature.geometry {
                    from_geometry(geometry, &mut out);
                }
            }
            Self::Geometry(geometry) => from_geometry(geometry, &mut out),
        }
        out
    }
}

/// A published geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geography {
    pub geography_id: GeographyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<Timestamp>,
    pub geography_json: GeographyShape,
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    /// Construct from latitude and longitude.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}
