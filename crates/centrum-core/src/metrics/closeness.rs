//! Closeness centrality: `(r - 1) / Σ d(v, u)` over the `r` nodes reachable
//! from `v` (including `v` itself).
//!
//! Unreachable nodes are left out of both the count and the sum, so each
//! connected component is scored on its own. A node with no reachable
//! neighbor scores `0`.

use rayon::prelude::*;
use tracing::instrument;

use crate::config::CentralityConfig;
use crate::metrics::shortest_path::{Adjacency, single_source};

#[must_use]
#[instrument(skip(adj, config), fields(nodes = adj.node_count()))]
pub fn closeness(adj: &Adjacency, config: &CentralityConfig) -> Vec<f64> {
    let n = adj.node_count();
    if config.parallel && n > 1 {
        (0..n)
            .into_par_iter()
            .map(|v| node_closeness(adj, v))
            .collect()
    } else {
        (0..n).map(|v| node_closeness(adj, v)).collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn node_closeness(adj: &Adjacency, v: usize) -> f64 {
    let sp = single_source(adj, v, false);
    let reachable = sp.order.len();
    let total: f64 = sp.order.iter().map(|&u| sp.dist[u]).sum();
    if reachable > 1 && total > 0.0 {
        (reachable - 1) as f64 / total
    } else {
        0.0
    }
}
