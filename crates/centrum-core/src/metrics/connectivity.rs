//! Connectivity (degree) centrality: incident edge count divided by the
//! highest degree in the graph, so scores fall in `[0, 1]`.
//!
//! Parallel edges each count toward the degree. A graph whose maximum degree
//! is zero scores every node `0`.

use tracing::instrument;

use crate::metrics::shortest_path::Adjacency;

#[must_use]
#[instrument(skip(adj), fields(nodes = adj.node_count()))]
#[allow(clippy::cast_precision_loss)]
pub fn connectivity(adj: &Adjacency) -> Vec<f64> {
    let degrees: Vec<usize> = (0..adj.node_count()).map(|v| adj.degree(v)).collect();
    let max = degrees.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; degrees.len()];
    }
    degrees.iter().map(|&d| d as f64 / max as f64).collect()
}
