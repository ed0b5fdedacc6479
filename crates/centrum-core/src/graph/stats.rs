//! Summary statistics for a spatial graph.
//!
//! Logged by the pipeline after construction so operators can see at a
//! glance whether an upload produced one connected network or a scatter of
//! fragments (which makes closeness per-component).

use petgraph::algo::connected_components;
use petgraph::visit::IntoNodeIdentifiers;

use crate::graph::SpatialGraph;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Number of connected components.
    pub component_count: usize,
    /// Nodes with no incident edge.
    pub isolated_node_count: usize,
    /// Highest number of incident edges on a single node.
    pub max_degree: usize,
    /// Sum of all edge weights.
    pub total_weight: f64,
}

impl GraphStats {
    #[must_use]
    pub fn from_graph(g: &SpatialGraph) -> Self {
        let degrees: Vec<usize> = g.graph.node_identifiers().map(|idx| g.degree(idx)).collect();

        Self {
            node_count: g.node_count(),
            edge_count: g.edge_count(),
            component_count: connected_components(&g.graph),
            isolated_node_count: degrees.iter().filter(|&&d| d == 0).count(),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            total_weight: g.graph.edge_weights().map(|e| e.weight).sum(),
        }
    }
}
