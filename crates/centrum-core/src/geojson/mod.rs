//! GeoJSON output (RFC 7946) for mapped centrality.
//!
//! [`serialize::to_feature_collection`] merges a [`crate::MappedMetric`] onto
//! graph geometry, reprojecting to WGS 84 with [`crs::Crs`] when the source
//! system is known. The types here are deliberately small: only the
//! geometry kinds centrum emits are modelled.

pub mod crs;
pub mod serialize;

use serde::{Deserialize, Serialize};

pub use serialize::to_feature_collection;

/// Property that always carries the mapped metric.
pub const VALUE_PROPERTY: &str = "value";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: FeatureCollectionType,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub geometry: Geometry,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    /// The mapped metric stored on this feature, if numeric.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.properties.get(VALUE_PROPERTY)?.as_f64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
}

impl FeatureCollection {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
