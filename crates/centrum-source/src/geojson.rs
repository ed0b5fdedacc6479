//! GeoJSON input reader.
//!
//! Accepts a `FeatureCollection` or a single `Feature`. Coordinates are
//! WGS 84 unless the document carries the legacy (pre RFC 7946) named `crs`
//! member, e.g. `{"type": "name", "properties": {"name": "EPSG:3857"}}`.
//! Geometry types centrum cannot use (`GeometryCollection`, unknown types,
//! `null`) are skipped.

use std::fs;
use std::path::Path;

use centrum_core::geojson::crs::Crs;
use centrum_core::{InputError, InputFeature};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection {
        features: Vec<RawFeature>,
        #[serde(default)]
        crs: Option<NamedCrs>,
    },
    Feature(RawFeature),
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct NamedCrs {
    properties: NamedCrsProperties,
}

#[derive(Debug, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum RawGeometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    #[serde(other)]
    Unsupported,
}

fn coord(p: &[f64]) -> Result<Coord<f64>, InputError> {
    match p {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(InputError::MalformedArchive(format!(
            "position needs at least two numbers, got {}",
            p.len()
        ))),
    }
}

fn line(ps: &[Position]) -> Result<LineString<f64>, InputError> {
    ps.iter().map(|p| coord(p)).collect::<Result<Vec<_>, _>>().map(LineString)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, InputError> {
    let mut rings = rings.iter().map(|r| line(r)).collect::<Result<Vec<_>, _>>()?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}

impl RawGeometry {
    fn into_geo(self) -> Result<Option<Geometry<f64>>, InputError> {
        let geometry = match self {
            Self::Point(p) => Geometry::Point(Point(coord(&p)?)),
            Self::MultiPoint(ps) => Geometry::MultiPoint(MultiPoint(
                ps.iter().map(|p| coord(p).map(Point)).collect::<Result<_, _>>()?,
            )),
            Self::LineString(ps) => Geometry::LineString(line(&ps)?),
            Self::MultiLineString(ls) => Geometry::MultiLineString(MultiLineString(
                ls.iter().map(|l| line(l)).collect::<Result<_, _>>()?,
            )),
            Self::Polygon(rings) => Geometry::Polygon(polygon(&rings)?),
            Self::MultiPolygon(polys) => Geometry::MultiPolygon(MultiPolygon(
                polys.iter().map(|p| polygon(p)).collect::<Result<_, _>>()?,
            )),
            Self::Unsupported => return Ok(None),
        };
        Ok(Some(geometry))
    }
}

/// Decode a GeoJSON document into features.
///
/// # Errors
///
/// [`InputError::MalformedArchive`] when the bytes are not a GeoJSON
/// `FeatureCollection` or `Feature`.
pub fn parse_geojson(bytes: &[u8]) -> Result<Vec<InputFeature>, InputError> {
    let document: Document = serde_json::from_slice(bytes)
        .map_err(|e| InputError::MalformedArchive(format!("invalid GeoJSON: {e}")))?;

    let (raw_features, crs) = match document {
        Document::FeatureCollection { features, crs } => (features, crs),
        Document::Feature(feature) => (vec![feature], None),
    };
    let crs = crs.map_or(Crs::Wgs84, |c| Crs::from_identifier(&c.properties.name));

    let mut skipped = 0_usize;
    let mut features = Vec::with_capacity(raw_features.len());
    for raw in raw_features {
        let Some(geometry) = raw.geometry.map(RawGeometry::into_geo).transpose()?.flatten() else {
            skipped += 1;
            continue;
        };
        features.push(InputFeature {
            geometry,
            properties: raw.properties.unwrap_or_default().into_iter().collect(),
            crs: Some(crs.clone()),
        });
    }

    info!(features = features.len(), skipped, %crs, "read GeoJSON");
    Ok(features)
}

/// Read and decode a GeoJSON file.
///
/// # Errors
///
/// See [`parse_geojson`]; I/O failures are [`InputError::Io`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_geojson(path: &Path) -> Result<Vec<InputFeature>, InputError> {
    parse_geojson(&fs::read(path)?)
}
