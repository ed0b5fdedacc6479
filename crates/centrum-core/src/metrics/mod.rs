//! Centrality metrics for the spatial graph.
//!
//! # Overview
//!
//! The metric set is closed: [`Metric`] names exactly three algorithms and
//! [`Metric::compute`] dispatches with an exhaustive `match`.
//!
//! - **Betweenness** (`betweenness`): which intersections and segments carry
//!   the most shortest routes? Also produces per-edge scores.
//! - **Closeness** (`closeness`): how near is a node, on average, to every
//!   node it can reach?
//! - **Connectivity** (`connectivity`): how many segments meet at a node,
//!   relative to the busiest node?
//!
//! All metrics run on edge `weight` (physical length) and return a
//! [`CentralityResult`] indexed by petgraph node (and edge) index.
//!
//! ```rust,ignore
//! use centrum_core::{Metric, config::CentralityConfig};
//!
//! let metric: Metric = "closeness".parse()?;
//! let result = metric.compute(&graph, &CentralityConfig::default())?;
//! ```

pub mod betweenness;
pub mod closeness;
pub mod connectivity;
pub mod shortest_path;

use std::fmt;
use std::str::FromStr;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::CentralityConfig;
use crate::error::{CentralityError, ComputationError, ValidationError};
use crate::graph::SpatialGraph;
use shortest_path::Adjacency;

/// The supported centrality algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Betweenness,
    Closeness,
    Connectivity,
}

impl Metric {
    pub const ALL: [Self; 3] = [Self::Betweenness, Self::Closeness, Self::Connectivity];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Betweenness => "betweenness",
            Self::Closeness => "closeness",
            Self::Connectivity => "connectivity",
        }
    }

    /// One-line description for help output.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Betweenness => "Share of weighted shortest paths through each node or segment",
            Self::Closeness => "Inverse mean shortest-path distance to reachable nodes",
            Self::Connectivity => "Incident segment count divided by the maximum degree",
        }
    }

    /// Whether mapped values are guaranteed to lie in `[0, 1]`.
    #[must_use]
    pub const fn is_normalized(self) -> bool {
        matches!(self, Self::Connectivity)
    }

    /// Run this metric over `graph`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyGraph`] when the graph has no nodes.
    /// - [`ComputationError::InvalidWeight`] when an edge weight is not
    ///   positive and finite.
    /// - [`ComputationError::NonFiniteScore`] when a score overflows.
    #[instrument(skip(graph, config), fields(metric = self.name()))]
    pub fn compute(
        self,
        graph: &SpatialGraph,
        config: &CentralityConfig,
    ) -> Result<CentralityResult, CentralityError> {
        if graph.node_count() == 0 {
            return Err(ValidationError::EmptyGraph.into());
        }
        let adj = Adjacency::from_graph(graph)?;

        let result = match self {
            Self::Betweenness => {
                let bc = betweenness::betweenness(&adj, config);
                CentralityResult {
                    metric: self,
                    nodes: bc.nodes,
                    edges: Some(bc.edges),
                }
            }
            Self::Closeness => CentralityResult {
                metric: self,
                nodes: closeness::closeness(&adj, config),
                edges: None,
            },
            Self::Connectivity => CentralityResult {
                metric: self,
                nodes: connectivity::connectivity(&adj),
                edges: None,
            },
        };

        result.ensure_finite()?;
        info!(
            nodes = result.nodes.len(),
            max = result.nodes.iter().copied().fold(0.0_f64, f64::max),
            "computed centrality"
        );
        Ok(result)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownMetric(s.to_string()))
    }
}

/// Scores from one engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityResult {
    pub metric: Metric,
    /// Score per node, indexed by `NodeIndex::index()`.
    pub nodes: Vec<f64>,
    /// Score per edge, indexed by `EdgeIndex::index()`. Only betweenness
    /// computes edge scores directly.
    pub edges: Option<Vec<f64>>,
}

impl CentralityResult {
    /// Score of `idx`, `0` if out of range.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> f64 {
        self.nodes.get(idx.index()).copied().unwrap_or(0.0)
    }

    /// Directly computed score of `idx`, if this metric has edge scores.
    #[must_use]
    pub fn edge(&self, idx: EdgeIndex) -> Option<f64> {
        self.edges.as_ref()?.get(idx.index()).copied()
    }

    fn ensure_finite(&self) -> Result<(), ComputationError> {
        let metric = self.metric.name();
        if let Some(index) = self.nodes.iter().position(|v| !v.is_finite()) {
            return Err(ComputationError::NonFiniteScore { metric, index });
        }
        if let Some(index) = self
            .edges
            .iter()
            .flatten()
            .position(|v| !v.is_finite())
        {
            return Err(ComputationError::NonFiniteScore { metric, index });
        }
        Ok(())
    }
}
