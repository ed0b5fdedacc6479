//! Spatial network graph.
//!
//! # Overview
//!
//! A [`SpatialGraph`] is an undirected, weighted petgraph [`UnGraph`] whose
//! nodes are street intersections or line endpoints and whose edges are the
//! segments between them. It is built fresh for every request by
//! [`build::GraphBuilder`] and never mutated by the metric code.
//!
//! ## Pipeline
//!
//! ```text
//! Vec<InputFeature>  ──┐
//!                      ├─ build::GraphBuilder ─→ SpatialGraph
//! RoadNetwork        ──┘
//!        ↓  stats::GraphStats::from_graph()
//! GraphStats (components, isolated nodes, total length, …)
//! ```
//!
//! ## Node identity
//!
//! Line endpoints are snapped to a square grid of `snap_tolerance` source
//! units ([`NodeKey::snapped`]). Two endpoints land on the same node exactly
//! when they round to the same grid cell, so endpoints that differ only by
//! floating-point noise merge. Points on opposite sides of a cell boundary
//! can still split. Provider road networks use the provider's node id
//! ([`NodeKey::Provider`]).
//!
//! Parallel edges (two lines between the same endpoints) stay distinct.

pub mod build;
pub mod stats;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use geo::{Coord, Geometry, LineString};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::geojson::crs::Crs;

pub use build::{BuildReport, GraphBuilder};
pub use stats::GraphStats;

/// String-keyed attributes carried from input features to output features.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Identity of a graph node within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    /// Grid cell of a snapped coordinate.
    Coord { x: i64, y: i64 },
    /// Exact `f64` bits, for coordinates with no grid cell in range.
    Exact { x: u64, y: u64 },
    /// Opaque id assigned by a road-network provider.
    Provider(i64),
}

impl NodeKey {
    /// Snap `coord` onto a grid of `tolerance` units.
    ///
    /// A non-positive tolerance, or a coordinate whose cell index does not
    /// fit in `i64`, falls back to exact `f64` bits, which only merges
    /// bit-identical coordinates.
    #[must_use]
    pub fn snapped(coord: Coord<f64>, tolerance: f64) -> Self {
        match (grid_cell(coord.x, tolerance), grid_cell(coord.y, tolerance)) {
            (Some(x), Some(y)) => Self::Coord { x, y },
            _ => Self::Exact {
                x: coord.x.to_bits(),
                y: coord.y.to_bits(),
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn grid_cell(value: f64, tolerance: f64) -> Option<i64> {
    if tolerance <= 0.0 || !tolerance.is_finite() {
        return None;
    }
    let cell = (value / tolerance).round();
    // `i64::MAX as f64` is 2^63, one past the largest i64.
    (cell.is_finite() && cell >= i64::MIN as f64 && cell < i64::MAX as f64).then_some(cell as i64)
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coord { x, y } => write!(f, "grid:{x}:{y}"),
            Self::Exact { x, y } => write!(f, "exact:{x:016x}:{y:016x}"),
            Self::Provider(id) => write!(f, "{id}"),
        }
    }
}

/// A graph node: its identity and its position in the source CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: NodeKey,
    pub position: Coord<f64>,
}

/// A graph edge. `weight` is strictly positive and finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub weight: f64,
    pub geometry: Option<LineString<f64>>,
    pub attributes: Attributes,
}

/// Undirected weighted network built for one request.
#[derive(Debug, Clone, Default)]
pub struct SpatialGraph {
    pub graph: UnGraph<Node, Edge>,
    pub node_map: HashMap<NodeKey, NodeIndex>,
    /// CRS of node positions and edge geometries, when known.
    pub crs: Option<Crs>,
}

impl SpatialGraph {
    #[must_use]
    pub fn new(crs: Option<Crs>) -> Self {
        Self {
            graph: UnGraph::default(),
            node_map: HashMap::new(),
            crs,
        }
    }

    /// Return the node for `key`, inserting it at `position` if new.
    ///
    /// The first position seen for a key is kept.
    pub fn intern_node(&mut self, key: NodeKey, position: Coord<f64>) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(Node { key, position });
        self.node_map.insert(key, idx);
        idx
    }

    pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, edge: Edge) -> EdgeIndex {
        self.graph.add_edge(a, b, edge)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn node_index(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.node_map.get(key).copied()
    }

    /// Number of edges incident to `idx`, counting parallel edges.
    #[must_use]
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }
}

/// One decoded vector feature handed over by a vector source.
///
/// Any geometry type may arrive here; only `LineString` survives graph
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFeature {
    pub geometry: Geometry<f64>,
    pub properties: Attributes,
    pub crs: Option<Crs>,
}

impl InputFeature {
    #[must_use]
    pub fn line(coords: Vec<(f64, f64)>, properties: Attributes, crs: Option<Crs>) -> Self {
        Self {
            geometry: Geometry::LineString(coords.into()),
            properties,
            crs,
        }
    }
}

/// Road network as delivered by a provider, WGS 84 positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub nodes: BTreeMap<i64, RoadNode>,
    pub edges: Vec<RoadEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub u: i64,
    pub v: i64,
    /// Length in metres.
    pub length: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}
