//! Betweenness centrality via Brandes' algorithm on weighted graphs.
//!
//! # Algorithm
//!
//! 1. For each source node `s`, run Dijkstra ([`single_source`]) to get
//!    shortest-path counts, predecessor edges and the settle order.
//! 2. Walk the settle order backwards, pushing each node's dependency onto
//!    its predecessors. The share passed along predecessor edge `e` is
//!    credited to `e` directly, so edge scores are exact rather than
//!    reconstructed from node scores.
//! 3. Sum over all sources.
//!
//! Every unordered pair is seen once from each end, so the sums are halved:
//! a score is the number of pairs whose shortest paths cross the node or
//! edge, each pair weighted by the fraction of its paths that do.
//!
//! Complexity: O(V · (E + V log V)).
//!
//! # Parallelism
//!
//! Sources are split into contiguous chunks. Each chunk accumulates its
//! sources in order; the chunk partials are then added in chunk order, so
//! the result only depends on the chunk size, not on thread scheduling.
//! Partials are computed one wave of `threads` chunks at a time, which bounds
//! peak memory to one partial per thread.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::config::CentralityConfig;
use crate::metrics::shortest_path::{Adjacency, single_source};

/// Node and edge betweenness, indexed like the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Betweenness {
    pub nodes: Vec<f64>,
    pub edges: Vec<f64>,
}

impl Betweenness {
    fn zeros(n: usize, m: usize) -> Self {
        Self {
            nodes: vec![0.0; n],
            edges: vec![0.0; m],
        }
    }

    fn add(&mut self, other: &Self) {
        for (a, b) in self.nodes.iter_mut().zip(&other.nodes) {
            *a += b;
        }
        for (a, b) in self.edges.iter_mut().zip(&other.edges) {
            *a += b;
        }
    }

    fn scale(&mut self, node_factor: f64, edge_factor: f64) {
        self.nodes.iter_mut().for_each(|v| *v *= node_factor);
        self.edges.iter_mut().for_each(|v| *v *= edge_factor);
    }
}

/// Compute node and edge betweenness over `adj`.
///
/// With `config.normalize_betweenness`, node scores are divided by the
/// `(n-1)(n-2)/2` pairs that exclude the node and edge scores by all
/// `n(n-1)/2` pairs.
#[must_use]
#[instrument(skip(adj, config), fields(nodes = adj.node_count(), edges = adj.edge_count()))]
#[allow(clippy::cast_precision_loss)]
pub fn betweenness(adj: &Adjacency, config: &CentralityConfig) -> Betweenness {
    let n = adj.node_count();
    let m = adj.edge_count();
    let sources: Vec<usize> = (0..n).collect();

    let mut acc = if config.parallel && n > 1 {
        let threads = rayon::current_num_threads().max(1);
        let chunk = n.div_ceil(threads * 4).max(1);
        debug!(chunk, threads, "accumulating betweenness in parallel");
        accumulate_in_waves(adj, &sources, chunk, threads)
    } else {
        accumulate(adj, &sources)
    };

    let (mut node_factor, mut edge_factor) = (0.5, 0.5);
    if config.normalize_betweenness {
        let nf = n as f64;
        if n > 2 {
            node_factor /= (nf - 1.0) * (nf - 2.0) / 2.0;
        }
        if n > 1 {
            edge_factor /= nf * (nf - 1.0) / 2.0;
        }
    }
    acc.scale(node_factor, edge_factor);
    acc
}

/// Accumulate `sources` in chunks of `chunk`, computing at most `wave`
/// chunk partials at a time and adding each wave's partials in chunk order.
fn accumulate_in_waves(
    adj: &Adjacency,
    sources: &[usize],
    chunk: usize,
    wave: usize,
) -> Betweenness {
    let chunks: Vec<&[usize]> = sources.chunks(chunk.max(1)).collect();
    let mut total = Betweenness::zeros(adj.node_count(), adj.edge_count());
    for batch in chunks.chunks(wave.max(1)) {
        let partials: Vec<Betweenness> = batch.par_iter().map(|c| accumulate(adj, c)).collect();
        for partial in &partials {
            total.add(partial);
        }
    }
    total
}

/// Brandes dependency accumulation for a run of sources.
fn accumulate(adj: &Adjacency, sources: &[usize]) -> Betweenness {
    let n = adj.node_count();
    let mut acc = Betweenness::zeros(n, adj.edge_count());
    let mut delta = vec![0.0; n];

    for &s in sources {
        let sp = single_source(adj, s, true);
        for &w in &sp.order {
            delta[w] = 0.0;
        }

        for &w in sp.order.iter().rev() {
            let coefficient = (1.0 + delta[w]) / sp.sigma[w];
            for &(v, e) in &sp.preds[w] {
                let share = sp.sigma[v] * coefficient;
                acc.edges[e] += share;
                delta[v] += share;
            }
            if w != s {
                acc.nodes[w] += delta[w];
            }
        }
    }

    acc
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, Edge, NodeKey, SpatialGraph};
    use geo::coord;

    fn build(n: i64, edges: &[(usize, usize, f64)]) -> Adjacency {
        let mut g = SpatialGraph::new(None);
        let ids: Vec<_> = (0..n)
            .map(|i| g.intern_node(NodeKey::Provider(i), coord! { x: 0.0, y: 0.0 }))
            .collect();
        for &(a, b, weight) in edges {
            g.add_edge(
                ids[a],
                ids[b],
                Edge {
                    weight,
                    geometry: None,
                    attributes: Attributes::new(),
                },
            );
        }
        Adjacency::from_graph(&g).expect("valid weights")
    }

    fn sequential() -> CentralityConfig {
        CentralityConfig {
            parallel: false,
            normalize_betweenness: false,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn single_edge_carries_its_own_pair() {
        let bc = betweenness(&build(2, &[(0, 1, 1.0)]), &sequential());
        assert_eq!(bc.nodes, vec![0.0, 0.0]);
        assert!(approx(bc.edges[0], 1.0));
    }

    #[test]
    fn path_middle_node_bridges_one_pair() {
        // 0 - 1 - 2
        let bc = betweenness(&build(3, &[(0, 1, 1.0), (1, 2, 1.0)]), &sequential());
        assert!(approx(bc.nodes[0], 0.0));
        assert!(approx(bc.nodes[1], 1.0));
        assert!(approx(bc.nodes[2], 0.0));
        // Each edge serves its own pair plus the 0-2 pair.
        assert!(approx(bc.edges[0], 2.0));
        assert!(approx(bc.edges[1], 2.0));
    }

    #[test]
    fn weights_steer_paths() {
        // 0 -5- 2 directly, or 0 -1- 1 -1- 2 around.
        let bc = betweenness(
            &build(3, &[(0, 2, 5.0), (0, 1, 1.0), (1, 2, 1.0)]),
            &sequential(),
        );
        assert!(approx(bc.nodes[1], 1.0));
        assert!(approx(bc.edges[0], 0.0), "heavy edge unused: {}", bc.edges[0]);
    }

    #[test]
    fn square_splits_credit_between_routes() {
        // 0-1-3 and 0-2-3, all weight 1.
        let bc = betweenness(
            &build(4, &[(0, 1, 1.0), (1, 3, 1.0), (0, 2, 1.0), (2, 3, 1.0)]),
            &sequential(),
        );
        // Node 1 carries half of 0-3; node 0 carries half of 1-2.
        for v in 0..4 {
            assert!(approx(bc.nodes[v], 0.5), "node {v}: {}", bc.nodes[v]);
        }
        for e in 0..4 {
            assert!(approx(bc.edges[e], 2.0), "edge {e}: {}", bc.edges[e]);
        }
    }

    #[test]
    fn parallel_edges_share_credit() {
        let bc = betweenness(&build(2, &[(0, 1, 1.0), (0, 1, 1.0)]), &sequential());
        assert!(approx(bc.edges[0], 0.5));
        assert!(approx(bc.edges[1], 0.5));
    }

    #[test]
    fn normalization_divides_by_pair_counts() {
        let config = CentralityConfig {
            parallel: false,
            normalize_betweenness: true,
        };
        // Star: center 0 with leaves 1..=3. Center lies on all 3 leaf pairs.
        let bc = betweenness(&build(4, &[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)]), &config);
        assert!(approx(bc.nodes[0], 1.0));
        // Each spoke serves 3 of the 6 pairs.
        assert!(approx(bc.edges[0], 0.5));
    }

    #[test]
    fn parallel_matches_sequential() {
        let edges: Vec<(usize, usize, f64)> = (0..30)
            .map(|i| (i, (i * 7 + 3) % 31, 1.0 + (i % 5) as f64))
            .chain((0..30).map(|i| (i, i + 1, 2.0)))
            .collect();
        let adj = build(31, &edges);
        let seq = betweenness(&adj, &sequential());
        let par = betweenness(
            &adj,
            &CentralityConfig {
                parallel: true,
                normalize_betweenness: false,
            },
        );
        for (a, b) in seq.nodes.iter().zip(&par.nodes) {
            assert!((a - b).abs() < 1e-9);
        }
        for (a, b) in seq.edges.iter().zip(&par.edges) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn waves_match_a_single_in_order_fold() {
        let edges: Vec<(usize, usize, f64)> = (0..20)
            .map(|i| (i, (i * 5 + 2) % 21, 1.0 + (i % 3) as f64))
            .chain((0..20).map(|i| (i, i + 1, 1.5)))
            .filter(|&(a, b, _)| a != b)
            .collect();
        let adj = build(21, &edges);
        let sources: Vec<usize> = (0..21).collect();

        let mut expected = Betweenness::zeros(adj.node_count(), adj.edge_count());
        for chunk in sources.chunks(2) {
            expected.add(&accumulate(&adj, chunk));
        }

        for wave in [1, 3, 64] {
            let got = accumulate_in_waves(&adj, &sources, 2, wave);
            assert_eq!(got.nodes, expected.nodes, "wave {wave}");
            assert_eq!(got.edges, expected.edges, "wave {wave}");
        }
    }
}
