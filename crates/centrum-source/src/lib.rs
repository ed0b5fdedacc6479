#![forbid(unsafe_code)]
//! centrum-source: turn user uploads and place names into centrum input.
//!
//! Two seams feed the core pipeline:
//!
//! - [`VectorSource`]: raw archive bytes → decoded [`InputFeature`]s.
//!   [`ArchiveSource`] reads a zip holding an ESRI shapefile or a GeoJSON
//!   file.
//! - [`RoadNetworkSource`]: place name → [`RoadNetwork`].
//!   [`OverpassSource`] geocodes with Nominatim and downloads streets from
//!   Overpass; [`RoadNetworkFile`] reads a previously saved network.
//!
//! Every failure is a [`centrum_core::InputError`], so the caller can render
//! it with the same error codes as the core.

pub mod archive;
pub mod geojson;
pub mod road;
pub mod shapefile;

use centrum_core::{InputError, InputFeature, RoadNetwork};

pub use archive::ArchiveSource;
pub use road::file::RoadNetworkFile;
pub use road::overpass::OverpassSource;

/// Decodes an uploaded archive into vector features.
pub trait VectorSource {
    /// # Errors
    ///
    /// [`InputError::NoGeometryFound`] when the archive holds no usable
    /// vector file or no line feature, [`InputError::MalformedArchive`] when
    /// it cannot be decoded.
    fn extract(&self, archive: &[u8]) -> Result<Vec<InputFeature>, InputError>;
}

/// Resolves a place to its street network.
pub trait RoadNetworkSource {
    /// # Errors
    ///
    /// [`InputError::LocationNotFound`] when the place cannot be resolved,
    /// [`InputError::Provider`] when the provider fails.
    fn fetch(&self, place: &str) -> Result<RoadNetwork, InputError>;
}
