//! Single-source shortest paths on positive edge weights.
//!
//! Dijkstra with a binary heap, recording for each settled node its
//! distance, the number of distinct shortest paths reaching it (`sigma`)
//! and the `(predecessor, edge)` pairs those paths arrive through. Parallel
//! edges of equal weight count as distinct paths.
//!
//! Distances are compared exactly, so two routes are tied only when their
//! summed weights are bit-identical.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::visit::EdgeRef;

use crate::error::ComputationError;
use crate::graph::SpatialGraph;

/// Neighbor lists `(node, edge, weight)` indexed by node, both directions.
#[derive(Debug, Clone)]
pub struct Adjacency {
    neighbors: Vec<Vec<(usize, usize, f64)>>,
    edge_count: usize,
}

impl Adjacency {
    /// Flatten the graph, checking every weight.
    ///
    /// # Errors
    ///
    /// Returns [`ComputationError::InvalidWeight`] for a weight that is not
    /// positive and finite.
    pub fn from_graph(g: &SpatialGraph) -> Result<Self, ComputationError> {
        let mut neighbors = vec![Vec::new(); g.node_count()];
        for edge in g.graph.edge_references() {
            let weight = edge.weight().weight;
            if !(weight.is_finite() && weight > 0.0) {
                return Err(ComputationError::InvalidWeight {
                    edge: edge.id().index(),
                    weight,
                });
            }
            let (a, b) = (edge.source().index(), edge.target().index());
            if a == b {
                continue;
            }
            neighbors[a].push((b, edge.id().index(), weight));
            neighbors[b].push((a, edge.id().index(), weight));
        }
        Ok(Self {
            neighbors,
            edge_count: g.edge_count(),
        })
    }

    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[must_use]
    pub fn degree(&self, node: usize) -> usize {
        self.neighbors.get(node).map_or(0, Vec::len)
    }
}

/// Result of one expansion from `source`.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    pub source: usize,
    /// Nodes in the order they were settled (non-decreasing distance).
    pub order: Vec<usize>,
    /// Distance from `source`; `f64::INFINITY` when unreachable.
    pub dist: Vec<f64>,
    /// Number of shortest paths from `source`. Empty unless paths are tracked.
    pub sigma: Vec<f64>,
    /// `(predecessor, edge)` pairs on shortest paths. Empty unless tracked.
    pub preds: Vec<Vec<(usize, usize)>>,
}

#[derive(Debug, Clone, Copy)]
struct Queued {
    dist: f64,
    node: usize,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Reversed so the max-heap pops the nearest node; ties by index.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Expand from `source`. With `track_paths` the path counts and
/// predecessor lists needed for betweenness are filled in.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn single_source(adj: &Adjacency, source: usize, track_paths: bool) -> ShortestPaths {
    let n = adj.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut settled = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let (mut sigma, mut preds) = if track_paths {
        (vec![0.0; n], vec![Vec::new(); n])
    } else {
        (Vec::new(), Vec::new())
    };

    let mut heap = BinaryHeap::new();
    dist[source] = 0.0;
    if track_paths {
        sigma[source] = 1.0;
    }
    heap.push(Queued {
        dist: 0.0,
        node: source,
    });

    while let Some(Queued { dist: d, node: v }) = heap.pop() {
        if settled[v] || d > dist[v] {
            continue;
        }
        settled[v] = true;
        order.push(v);

        for &(w, e, weight) in &adj.neighbors[v] {
            if settled[w] {
                continue;
            }
            let candidate = d + weight;
            if candidate < dist[w] {
                dist[w] = candidate;
                if track_paths {
                    sigma[w] = sigma[v];
                    preds[w].clear();
                    preds[w].push((v, e));
                }
                heap.push(Queued {
                    dist: candidate,
                    node: w,
                });
            } else if track_paths && candidate == dist[w] {
                sigma[w] += sigma[v];
                preds[w].push((v, e));
            }
        }
    }

    ShortestPaths {
        source,
        order,
        dist,
        sigma,
        preds,
    }
}
