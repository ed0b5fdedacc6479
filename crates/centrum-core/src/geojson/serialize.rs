//! Merge mapped scores onto geometry and emit a WGS 84 feature collection.
//!
//! Edge features keep their carried attributes and gain `weight` and
//! `value`; an input attribute named `value` is overwritten by the metric.
//! Node features carry `id` (the provider id, or the node index for snapped
//! line endpoints) and `value`.
//!
//! Reprojection is best-effort. With no CRS or an unsupported one the
//! source coordinates are emitted unchanged; a single coordinate that fails
//! to reproject is emitted unchanged as well. Both cases are logged, never
//! raised.

use geo::Coord;
use petgraph::visit::EdgeRef;
use serde_json::{Map, Value, json};
use tracing::{instrument, warn};

use crate::geojson::crs::Crs;
use crate::geojson::{
    Feature, FeatureCollection, FeatureCollectionType, FeatureType, Geometry, VALUE_PROPERTY,
};
use crate::graph::{NodeKey, SpatialGraph};
use crate::mapping::{Granularity, MappedMetric};

struct Reprojector<'a> {
    crs: Option<&'a Crs>,
    failures: usize,
}

impl<'a> Reprojector<'a> {
    fn new(crs: Option<&'a Crs>) -> Self {
        match crs {
            None => warn!("source CRS unknown, emitting coordinates as-is"),
            Some(c) if !c.is_known() => {
                warn!(crs = %c, "unsupported source CRS, emitting coordinates as-is");
            }
            Some(_) => {}
        }
        Self {
            crs: crs.filter(|c| c.is_known()),
            failures: 0,
        }
    }

    fn project(&mut self, c: Coord<f64>) -> [f64; 2] {
        let Some(crs) = self.crs else {
            return [c.x, c.y];
        };
        if let Some(out) = crs.to_wgs84(c) {
            [out.x, out.y]
        } else {
            self.failures += 1;
            [c.x, c.y]
        }
    }
}

/// Build the output collection for `mapped` over `graph`.
#[must_use]
#[instrument(skip(graph, mapped), fields(granularity = %mapped.granularity, entities = mapped.len()))]
pub fn to_feature_collection(graph: &SpatialGraph, mapped: &MappedMetric) -> FeatureCollection {
    let mut projector = Reprojector::new(graph.crs.as_ref());

    let features = match mapped.granularity {
        Granularity::Edge => edge_features(graph, mapped, &mut projector),
        Granularity::Node => node_features(graph, mapped, &mut projector),
    };

    if projector.failures > 0 {
        warn!(
            failures = projector.failures,
            "some coordinates could not be reprojected and were emitted as-is"
        );
    }

    FeatureCollection {
        kind: FeatureCollectionType::FeatureCollection,
        features,
    }
}

fn edge_features(
    graph: &SpatialGraph,
    mapped: &MappedMetric,
    projector: &mut Reprojector<'_>,
) -> Vec<Feature> {
    graph
        .graph
        .edge_references()
        .map(|edge| {
            let data = edge.weight();
            let coordinates = match &data.geometry {
                Some(line) => line.0.iter().map(|&c| projector.project(c)).collect(),
                None => vec![
                    projector.project(graph.graph[edge.source()].position),
                    projector.project(graph.graph[edge.target()].position),
                ],
            };

            let mut properties: Map<String, Value> = data
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            properties.insert("weight".to_string(), json!(data.weight));
            properties.insert(VALUE_PROPERTY.to_string(), json!(mapped.value(edge.id().index())));

            Feature {
                kind: FeatureType::Feature,
                geometry: Geometry::LineString { coordinates },
                properties,
            }
        })
        .collect()
}

fn node_features(
    graph: &SpatialGraph,
    mapped: &MappedMetric,
    projector: &mut Reprojector<'_>,
) -> Vec<Feature> {
    graph
        .graph
        .node_indices()
        .map(|idx| {
            let node = &graph.graph[idx];
            let id = match node.key {
                NodeKey::Provider(id) => json!(id),
                NodeKey::Coord { .. } | NodeKey::Exact { .. } => json!(idx.index()),
            };

            let mut properties = Map::new();
            properties.insert("id".to_string(), id);
            properties.insert(VALUE_PROPERTY.to_string(), json!(mapped.value(idx.index())));

            Feature {
                kind: FeatureType::Feature,
                geometry: Geometry::Point {
                    coordinates: projector.project(node.position),
                },
                properties,
            }
        })
        .collect()
}
