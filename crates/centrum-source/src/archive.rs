//! Zip archive upload → vector features.
//!
//! The archive is unpacked into a [`tempfile::TempDir`] owned by the call;
//! the directory is removed when the guard drops, whichever way `extract`
//! returns. Inside it the first `.shp` wins (paths walked in sorted order),
//! falling back to the first `.geojson` / `.json` file.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use centrum_core::{InputError, InputFeature};
use geo::Geometry;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::VectorSource;
use crate::geojson::read_geojson;
use crate::shapefile::read_shapefile;

/// The vector file picked out of an unpacked archive.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VectorFile {
    Shapefile(PathBuf),
    GeoJson(PathBuf),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveSource;

impl ArchiveSource {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| wanted.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

/// Unpack `archive` below `dest`. Entries escaping `dest` are skipped.
fn unpack(archive: &[u8], dest: &Path) -> Result<usize, InputError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| InputError::MalformedArchive(format!("not a zip archive: {e}")))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| InputError::MalformedArchive(format!("unreadable zip entry {i}: {e}")))?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(name = entry.name(), "skipping zip entry outside the archive root");
            continue;
        };
        let out = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %relative.display(), "unpacking zip entry");
        let mut file = fs::File::create(&out)?;
        io::copy(&mut entry, &mut file)?;
        written += 1;
    }
    Ok(written)
}

/// Pick the vector file to read from an unpacked tree.
fn find_vector_file(root: &Path) -> Option<VectorFile> {
    let files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| !is_hidden(p, root))
        .collect();

    files
        .iter()
        .find(|p| has_extension(p, &["shp"]))
        .map(|p| VectorFile::Shapefile(p.clone()))
        .or_else(|| {
            files
                .iter()
                .find(|p| has_extension(p, &["geojson", "json"]))
                .map(|p| VectorFile::GeoJson(p.clone()))
        })
}

/// macOS archives carry `__MACOSX/` and `._name` resource forks.
fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|rel| {
        rel.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            s.starts_with('.') || s == "__MACOSX"
        })
    })
}

impl VectorSource for ArchiveSource {
    #[instrument(skip_all, fields(bytes = archive.len()))]
    fn extract(&self, archive: &[u8]) -> Result<Vec<InputFeature>, InputError> {
        let dir = tempfile::Builder::new().prefix("centrum-").tempdir()?;
        let entries = unpack(archive, dir.path())?;
        debug!(entries, dir = %dir.path().display(), "unpacked archive");

        let features = match find_vector_file(dir.path()) {
            Some(VectorFile::Shapefile(path)) => read_shapefile(&path)?,
            Some(VectorFile::GeoJson(path)) => read_geojson(&path)?,
            None => {
                warn!(entries, "archive holds no .shp or GeoJSON file");
                return Err(InputError::NoGeometryFound);
            }
        };

        let lines = features
            .iter()
            .filter(|f| matches!(f.geometry, Geometry::LineString(_)))
            .count();
        info!(features = features.len(), lines, "extracted archive");
        if lines == 0 {
            return Err(InputError::NoGeometryFound);
        }
        Ok(features)
    }
}
