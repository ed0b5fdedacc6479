//! Graph construction from line features and provider road networks.
//!
//! # Line features
//!
//! Each `LineString` becomes one edge between the nodes of its first and
//! last coordinate. Every other geometry type is filtered out before
//! construction. A line is rejected as degenerate when it has fewer than two
//! vertices, a non-finite coordinate, a non-positive or non-finite length,
//! or when both endpoints snap to the same node.
//!
//! Edge weight is the haversine length in metres for geographic input
//! (WGS 84) and the planar length in source units otherwise.
//!
//! # Road networks
//!
//! Provider nodes and edges are copied as-is. Edges with an unusable length
//! or a dangling endpoint are skipped and logged.

use geo::{Coord, EuclideanLength, Geometry, HaversineLength, LineString};
use tracing::{debug, info, instrument, warn};

use crate::error::InputError;
use crate::geojson::crs::Crs;
use crate::graph::{Edge, InputFeature, NodeKey, RoadNetwork, SpatialGraph};

/// Outcome counters for one graph construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Edges added to the graph.
    pub accepted: usize,
    /// Features dropped because they are not `LineString`s.
    pub filtered_non_line: usize,
    /// Lines or road edges rejected by the validity rules.
    pub rejected_degenerate: usize,
}

/// Builds [`SpatialGraph`]s with a fixed node snapping rule.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    snap_tolerance: f64,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl GraphBuilder {
    #[must_use]
    pub const fn new(snap_tolerance: f64) -> Self {
        Self { snap_tolerance }
    }

    /// Build a graph from decoded vector features.
    ///
    /// The graph CRS is taken from the first feature that declares one.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::NoGeometryFound`] when no valid line remains
    /// after filtering.
    #[instrument(skip(self, features), fields(features = features.len()))]
    pub fn from_features(
        &self,
        features: Vec<InputFeature>,
    ) -> Result<(SpatialGraph, BuildReport), InputError> {
        let crs = features.iter().find_map(|f| f.crs.clone());
        let geographic = crs.as_ref().is_some_and(Crs::is_geographic);
        let mut graph = SpatialGraph::new(crs);
        let mut report = BuildReport::default();

        for (i, feature) in features.into_iter().enumerate() {
            let Geometry::LineString(line) = feature.geometry else {
                report.filtered_non_line += 1;
                continue;
            };

            let Some((start, end, weight)) = self.line_endpoints(&line, geographic) else {
                debug!(feature = i, "rejecting degenerate line");
                report.rejected_degenerate += 1;
                continue;
            };

            let a = graph.intern_node(NodeKey::snapped(start, self.snap_tolerance), start);
            let b = graph.intern_node(NodeKey::snapped(end, self.snap_tolerance), end);
            graph.add_edge(
                a,
                b,
                Edge {
                    weight,
                    geometry: Some(line),
                    attributes: feature.properties,
                },
            );
            report.accepted += 1;
        }

        info!(
            accepted = report.accepted,
            filtered_non_line = report.filtered_non_line,
            rejected_degenerate = report.rejected_degenerate,
            nodes = graph.node_count(),
            "built graph from line features"
        );

        if report.accepted == 0 {
            return Err(InputError::NoGeometryFound);
        }
        Ok((graph, report))
    }

    /// Build a graph from a provider road network. Positions are `(lon, lat)`.
    ///
    /// Never fails on its own; an edgeless result is rejected later by the
    /// pipeline.
    #[instrument(skip(self, network), fields(nodes = network.nodes.len(), edges = network.edges.len()))]
    pub fn from_road_network(&self, network: &RoadNetwork) -> (SpatialGraph, BuildReport) {
        let mut graph = SpatialGraph::new(Some(Crs::Wgs84));
        let mut report = BuildReport::default();

        for (&id, node) in &network.nodes {
            graph.intern_node(
                NodeKey::Provider(id),
                Coord {
                    x: node.lon,
                    y: node.lat,
                },
            );
        }

        for edge in &network.edges {
            let endpoints = (
                graph.node_index(&NodeKey::Provider(edge.u)),
                graph.node_index(&NodeKey::Provider(edge.v)),
            );
            let (Some(a), Some(b)) = endpoints else {
                warn!(u = edge.u, v = edge.v, "skipping road edge with unknown endpoint");
                report.rejected_degenerate += 1;
                continue;
            };
            if a == b || !(edge.length.is_finite() && edge.length > 0.0) {
                warn!(u = edge.u, v = edge.v, length = edge.length, "skipping degenerate road edge");
                report.rejected_degenerate += 1;
                continue;
            }

            graph.add_edge(
                a,
                b,
                Edge {
                    weight: edge.length,
                    geometry: None,
                    attributes: edge.attributes.clone(),
                },
            );
            report.accepted += 1;
        }

        info!(
            accepted = report.accepted,
            rejected_degenerate = report.rejected_degenerate,
            nodes = graph.node_count(),
            "built graph from road network"
        );
        (graph, report)
    }

    /// Endpoints and weight of a valid line, `None` if degenerate.
    fn line_endpoints(
        self,
        line: &LineString<f64>,
        geographic: bool,
    ) -> Option<(Coord<f64>, Coord<f64>, f64)> {
        if line.0.len() < 2 || line.0.iter().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
            return None;
        }
        let start = *line.0.first()?;
        let end = *line.0.last()?;
        if NodeKey::snapped(start, self.snap_tolerance) == NodeKey::snapped(end, self.snap_tolerance)
        {
            return None;
        }

        let weight = if geographic {
            line.haversine_length()
        } else {
            line.euclidean_length()
        };
        (weight.is_finite() && weight > 0.0).then_some((start, end, weight))
    }
}
