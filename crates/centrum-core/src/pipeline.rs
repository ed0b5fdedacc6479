//! End-to-end analysis: graph → centrality → mapping → GeoJSON.
//!
//! Validation short-circuits before any centrality work: an input without
//! valid lines fails with [`InputError::NoGeometryFound`], an edgeless graph
//! with [`ValidationError::EmptyGraph`] and an unrecognized metric name with
//! [`ValidationError::UnknownMetric`].

use tracing::{info, instrument};

use crate::config::CentrumConfig;
use crate::error::{CentralityError, ValidationError};
use crate::geojson::{FeatureCollection, to_feature_collection};
use crate::graph::stats::GraphStats;
use crate::graph::{GraphBuilder, InputFeature, RoadNetwork, SpatialGraph};
use crate::mapping::{Granularity, map_metric};
use crate::metrics::Metric;
use crate::timing;

/// Decoded input, ready for graph construction.
#[derive(Debug, Clone)]
pub enum NetworkInput {
    /// Digitized line features from a vector source.
    Lines(Vec<InputFeature>),
    /// A provider street network.
    Road(RoadNetwork),
}

impl NetworkInput {
    /// Granularity used when the caller does not choose one.
    #[must_use]
    pub const fn default_granularity(&self) -> Granularity {
        match self {
            Self::Lines(_) => Granularity::Edge,
            Self::Road(_) => Granularity::Node,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Lines(_) => "lines",
            Self::Road(_) => "road",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: CentrumConfig,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: CentrumConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CentrumConfig {
        &self.config
    }

    /// Run `metric` over `input` and serialize the annotated geometry.
    ///
    /// # Errors
    ///
    /// Any [`CentralityError`]; no partial output is produced.
    #[instrument(skip(self, input), fields(input = input.kind()))]
    pub fn run(
        &self,
        input: NetworkInput,
        metric: &str,
        granularity: Option<Granularity>,
    ) -> Result<FeatureCollection, CentralityError> {
        let granularity = granularity.unwrap_or_else(|| input.default_granularity());
        let graph = timing::timed("pipeline.build", || self.build(input))?;

        let stats = GraphStats::from_graph(&graph);
        info!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            components = stats.component_count,
            isolated = stats.isolated_node_count,
            max_degree = stats.max_degree,
            total_weight = stats.total_weight,
            "graph ready"
        );
        if stats.edge_count == 0 {
            return Err(ValidationError::EmptyGraph.into());
        }

        let metric: Metric = metric.parse()?;
        let result = timing::timed("pipeline.compute", || {
            metric.compute(&graph, &self.config.centrality)
        })?;
        let mapped = timing::timed("pipeline.map", || map_metric(&result, &graph, granularity));
        let collection = timing::timed("pipeline.serialize", || {
            to_feature_collection(&graph, &mapped)
        });

        info!(
            metric = %metric,
            granularity = %granularity,
            features = collection.len(),
            "analysis complete"
        );
        Ok(collection)
    }

    fn build(&self, input: NetworkInput) -> Result<SpatialGraph, CentralityError> {
        let builder = GraphBuilder::new(self.config.graph.snap_tolerance);
        let graph = match input {
            NetworkInput::Lines(features) => builder.from_features(features)?.0,
            NetworkInput::Road(network) => builder.from_road_network(&network).0,
        };
        Ok(graph)
    }
}
