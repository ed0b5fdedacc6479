#![forbid(unsafe_code)]
//! centrum-core library.
//!
//! Builds an undirected weighted [`graph::SpatialGraph`] from line features or
//! a provider road network, computes one centrality [`metrics::Metric`] over
//! it, maps the scores onto nodes or edges and serializes the annotated
//! geometry as a GeoJSON [`geojson::FeatureCollection`].
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`CentralityError`]; config
//!   loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod geojson;
pub mod graph;
pub mod mapping;
pub mod metrics;
pub mod pipeline;
pub mod timing;

pub use error::{CentralityError, ComputationError, ErrorCode, InputError, ValidationError};
pub use graph::{InputFeature, RoadNetwork, SpatialGraph};
pub use mapping::{Granularity, MappedMetric};
pub use metrics::{CentralityResult, Metric};
pub use pipeline::{NetworkInput, Pipeline};
