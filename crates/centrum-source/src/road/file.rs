use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use centrum_core::{InputError, RoadNetwork};
use tracing::{info, instrument};

use crate::RoadNetworkSource;

/// Reads a saved [`RoadNetwork`] JSON document. The "place" is the file
/// path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoadNetworkFile;

impl RoadNetworkFile {
    /// # Errors
    ///
    /// [`InputError::LocationNotFound`] when `path` does not exist,
    /// [`InputError::MalformedArchive`] when it is not a road network.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<RoadNetwork, InputError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => InputError::LocationNotFound(path.display().to_string()),
            _ => InputError::Io(e),
        })?;
        let network: RoadNetwork = serde_json::from_slice(&bytes)
            .map_err(|e| InputError::MalformedArchive(format!("invalid road network: {e}")))?;
        info!(nodes = network.nodes.len(), edges = network.edges.len(), "read road network");
        Ok(network)
    }
}

impl RoadNetworkSource for RoadNetworkFile {
    fn fetch(&self, place: &str) -> Result<RoadNetwork, InputError> {
        Self::read(Path::new(place))
    }
}
