//! In-memory feature model.
//!
//! A [`Feature`] is one geometry plus an open-ended attribute map; identity
//! is positional within its source collection and features are immutable
//! once ingested. [`FeatureCollection`] is the unit the partitioner consumes
//! and the extractor produces.

use crate::error::{GeochunkError, Result};
use crate::geometry::BoundingBox;
use serde_json::json;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Open-ended key/value attribute payload of a feature.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// One polygon/multipolygon geometry with its decoded attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: geo::Geometry,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: geo::Geometry, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Bounding box of the geometry, `None` for empty geometries.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of_geometry(&self.geometry)
    }

    /// Convert a parsed GeoJSON feature into the in-memory model.
    ///
    /// Fails when the feature carries no geometry or the geometry cannot be
    /// represented as a `geo` type.
    pub fn from_geojson(feature: geojson::Feature) -> Result<Self> {
        let geometry = feature
            .geometry
            .ok_or_else(|| GeochunkError::InvalidInput("feature has no geometry".to_string()))?;
        let geometry = geo::Geometry::try_from(&geometry)
            .map_err(|e| GeochunkError::InvalidInput(format!("unsupported geometry: {e}")))?;

        Ok(Self {
            geometry,
            attributes: feature.properties.unwrap_or_default(),
        })
    }

    /// Convert back to a GeoJSON feature with plain (decoded) properties.
    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(self.attributes.clone()),
            foreign_members: None,
        }
    }
}

/// An ordered collection of features sharing one coordinate reference system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Total bounds of every feature geometry, `None` for an empty collection.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(Feature::bounding_box)
            .reduce(|acc, bbox| acc.union(&bbox))
    }

    /// Build the GeoJSON document form, tagged with EPSG:4326.
    ///
    /// The `crs` member is non-standard in RFC 7946 but kept for
    /// compatibility with consumers of the original outputs.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let mut foreign = serde_json::Map::new();
        foreign.insert(
            "crs".to_string(),
            json!({
                "type": "name",
                "properties": { "name": "urn:ogc:def:crs:EPSG::4326" }
            }),
        );

        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(Feature::to_geojson).collect(),
            foreign_members: Some(foreign),
        }
    }

    /// Write the collection to `path` as a GeoJSON document.
    pub fn write_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.to_geojson())?;
        Ok(())
    }
}
