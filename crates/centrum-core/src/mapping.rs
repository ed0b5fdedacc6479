//! Reconcile node-level centrality with the requested output granularity.
//!
//! - [`Granularity::Node`]: node scores pass through unchanged.
//! - [`Granularity::Edge`]: betweenness uses the edge scores the engine
//!   accumulated directly. Closeness and connectivity use the mean of the
//!   two endpoint scores. That mean is an approximation of an edge metric,
//!   kept deliberately so outputs stay comparable with earlier runs.
//!
//! Mapping never mutates the graph; it returns a new [`MappedMetric`] that
//! the serializer merges onto output features.

use std::fmt;
use std::str::FromStr;

use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::instrument;

use crate::graph::SpatialGraph;
use crate::metrics::{CentralityResult, Metric};

/// Which entities carry scores in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Node,
    Edge,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Edge => "edge",
        })
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "nodes" => Ok(Self::Node),
            "edge" | "edges" => Ok(Self::Edge),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

/// Scores for every entity at one granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedMetric {
    pub metric: Metric,
    pub granularity: Granularity,
    /// Indexed by node or edge index, depending on `granularity`.
    pub values: Vec<f64>,
}

impl MappedMetric {
    /// Value for entity `index`. Entities without a score read as `0`.
    #[must_use]
    pub fn value(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Map `result` onto the entities of `graph` at `granularity`.
#[must_use]
#[instrument(skip(result, graph), fields(metric = %result.metric))]
pub fn map_metric(
    result: &CentralityResult,
    graph: &SpatialGraph,
    granularity: Granularity,
) -> MappedMetric {
    let values = match granularity {
        Granularity::Node => (0..graph.node_count())
            .map(|i| result.nodes.get(i).copied().unwrap_or(0.0))
            .collect(),
        Granularity::Edge => graph
            .graph
            .edge_references()
            .map(|edge| {
                result.edge(edge.id()).unwrap_or_else(|| {
                    f64::midpoint(result.node(edge.source()), result.node(edge.target()))
                })
            })
            .collect(),
    };

    MappedMetric {
        metric: result.metric,
        granularity,
        values,
    }
}
