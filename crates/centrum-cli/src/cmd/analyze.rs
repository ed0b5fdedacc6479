use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use centrum_core::config::CentrumConfig;
use centrum_core::geojson::FeatureCollection;
use centrum_core::{CentralityError, Granularity, InputError, NetworkInput, Pipeline};
use centrum_source::{
    ArchiveSource, OverpassSource, RoadNetworkFile, RoadNetworkSource, VectorSource,
};
use clap::{ArgGroup, Args};
use tracing::{error, info};

use crate::output::{Envelope, emit};

/// Arguments for `centrum analyze`.
#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["archive", "location", "road_network"])
))]
pub struct AnalyzeArgs {
    /// Centrality metric: betweenness, closeness or connectivity.
    #[arg(short, long)]
    pub metric: String,

    /// Zip archive holding a line shapefile or GeoJSON file.
    #[arg(long, value_name = "ZIP")]
    pub archive: Option<PathBuf>,

    /// Place name to geocode and download from OpenStreetMap.
    #[arg(long, value_name = "PLACE")]
    pub location: Option<String>,

    /// Saved road network JSON document.
    #[arg(long, value_name = "JSON")]
    pub road_network: Option<PathBuf>,

    /// Score nodes or edges (default: edge for archives, node for road networks).
    #[arg(short, long, value_name = "node|edge")]
    pub granularity: Option<Granularity>,

    /// Write the response to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON.
    #[arg(long)]
    pub pretty: bool,

    /// Divide betweenness by the number of node pairs.
    #[arg(long)]
    pub normalize: bool,

    /// Run shortest-path expansions on one thread.
    #[arg(long)]
    pub sequential: bool,

    /// Endpoint snapping grid, in source CRS units.
    #[arg(long, value_name = "UNITS")]
    pub snap_tolerance: Option<f64>,
}

impl AnalyzeArgs {
    /// Apply flag overrides on top of the file config.
    fn apply(&self, mut config: CentrumConfig) -> CentrumConfig {
        if self.normalize {
            config.centrality.normalize_betweenness = true;
        }
        if self.sequential {
            config.centrality.parallel = false;
        }
        if let Some(tolerance) = self.snap_tolerance {
            config.graph.snap_tolerance = tolerance;
        }
        config
    }
}

fn load_input(args: &AnalyzeArgs, config: &CentrumConfig) -> Result<NetworkInput, InputError> {
    if let Some(path) = &args.archive {
        let bytes = fs::read(path)?;
        return ArchiveSource::new().extract(&bytes).map(NetworkInput::Lines);
    }
    if let Some(place) = &args.location {
        return OverpassSource::new(&config.provider)
            .fetch(place)
            .map(NetworkInput::Road);
    }
    if let Some(path) = &args.road_network {
        return RoadNetworkFile::read(path).map(NetworkInput::Road);
    }
    Err(InputError::NoGeometryFound)
}

fn analyze(args: &AnalyzeArgs, config: CentrumConfig) -> Result<FeatureCollection, CentralityError> {
    let input = load_input(args, &config)?;
    Pipeline::new(config).run(input, &args.metric, args.granularity)
}

/// Run one analysis and emit the response envelope.
///
/// Pipeline failures are reported inside the envelope and yield a failing
/// exit code; only I/O on the output side is returned as `Err`.
///
/// # Errors
///
/// Returns an error if the envelope cannot be written.
pub fn run_analyze(args: &AnalyzeArgs, config: CentrumConfig) -> Result<ExitCode> {
    let config = args.apply(config);
    match analyze(args, config) {
        Ok(collection) => {
            info!(features = collection.len(), "analysis succeeded");
            emit(
                &Envelope::Success { data: &collection },
                args.output.as_deref(),
                args.pretty,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(code = %err.code(), "{err}");
            emit(&Envelope::<()>::from_error(&err), None, args.pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
