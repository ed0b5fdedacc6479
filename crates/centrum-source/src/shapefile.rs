//! ESRI shapefile reader: `.shp` geometry, `.dbf` attributes, `.prj` CRS.
//!
//! Only what a street layer needs is decoded. Shape types:
//!
//! | code         | kind       | decoded as                                  |
//! |--------------|------------|---------------------------------------------|
//! | 0            | null       | skipped                                     |
//! | 1, 11, 21    | point      | `Point`                                     |
//! | 3, 13, 23    | polyline   | `LineString`, or `MultiLineString` if multi-part |
//! | 5, 15, 25    | polygon    | `Polygon` (first ring exterior)             |
//! | 8, 18, 28    | multipoint | `MultiPoint`                                |
//!
//! Z and M values are ignored. Records whose `.dbf` row carries the deletion
//! flag are dropped.

use std::fs;
use std::path::{Path, PathBuf};

use centrum_core::geojson::crs::Crs;
use centrum_core::graph::Attributes;
use centrum_core::{InputError, InputFeature};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Point, Polygon};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

const FILE_CODE: i32 = 9994;
const HEADER_LEN: usize = 100;
const DBF_FIELD_TERMINATOR: u8 = 0x0D;
const DBF_DELETED: u8 = b'*';

fn malformed(msg: impl Into<String>) -> InputError {
    InputError::MalformedArchive(msg.into())
}

// ---------------------------------------------------------------------------
// Byte access
// ---------------------------------------------------------------------------

fn take<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], InputError> {
    offset
        .checked_add(N)
        .and_then(|end| bytes.get(offset..end))
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| malformed(format!("unexpected end of data at byte {offset}")))
}

fn be_i32(bytes: &[u8], offset: usize) -> Result<i32, InputError> {
    take(bytes, offset).map(i32::from_be_bytes)
}

fn le_i32(bytes: &[u8], offset: usize) -> Result<i32, InputError> {
    take(bytes, offset).map(i32::from_le_bytes)
}

fn le_u32(bytes: &[u8], offset: usize) -> Result<u32, InputError> {
    take(bytes, offset).map(u32::from_le_bytes)
}

fn le_u16(bytes: &[u8], offset: usize) -> Result<u16, InputError> {
    take(bytes, offset).map(u16::from_le_bytes)
}

fn le_f64(bytes: &[u8], offset: usize) -> Result<f64, InputError> {
    take(bytes, offset).map(f64::from_le_bytes)
}

fn count(value: i32, what: &str) -> Result<usize, InputError> {
    usize::try_from(value).map_err(|_| malformed(format!("negative {what}: {value}")))
}

fn coord_at(content: &[u8], offset: usize) -> Result<Coord<f64>, InputError> {
    Ok(Coord {
        x: le_f64(content, offset)?,
        y: le_f64(content, offset + 8)?,
    })
}

// ---------------------------------------------------------------------------
// .shp
// ---------------------------------------------------------------------------

/// Decode every record of a `.shp` file. Null and unsupported shapes are
/// `None` so record positions keep lining up with `.dbf` rows.
///
/// # Errors
///
/// [`InputError::MalformedArchive`] on a bad file code or truncated record.
pub fn parse_shp(bytes: &[u8]) -> Result<Vec<Option<Geometry<f64>>>, InputError> {
    if be_i32(bytes, 0)? != FILE_CODE {
        return Err(malformed("not a shapefile (bad file code)"));
    }
    if bytes.len() < HEADER_LEN {
        return Err(malformed("shapefile header truncated"));
    }

    let mut records = Vec::new();
    let mut offset = HEADER_LEN;
    while offset + 8 <= bytes.len() {
        let content_len = count(be_i32(bytes, offset + 4)?, "record length")? * 2;
        let start = offset + 8;
        let content = start
            .checked_add(content_len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| malformed(format!("record {} truncated", records.len() + 1)))?;
        records.push(parse_record(content)?);
        offset = start + content_len;
    }
    Ok(records)
}

fn parse_record(content: &[u8]) -> Result<Option<Geometry<f64>>, InputError> {
    let shape_type = le_i32(content, 0)?;
    let geometry = match shape_type {
        0 => return Ok(None),
        1 | 11 | 21 => Geometry::Point(Point(coord_at(content, 4)?)),
        3 | 13 | 23 => {
            let mut parts = parse_parts(content)?;
            if parts.len() == 1 {
                Geometry::LineString(parts.remove(0))
            } else {
                Geometry::MultiLineString(MultiLineString(parts))
            }
        }
        5 | 15 | 25 => {
            let mut rings = parse_parts(content)?.into_iter();
            let Some(exterior) = rings.next() else {
                return Ok(None);
            };
            Geometry::Polygon(Polygon::new(exterior, rings.collect()))
        }
        8 | 18 | 28 => {
            let n = count(le_i32(content, 36)?, "point count")?;
            let points = (0..n)
                .map(|i| coord_at(content, 40 + 16 * i).map(Point))
                .collect::<Result<Vec<_>, _>>()?;
            Geometry::MultiPoint(MultiPoint(points))
        }
        other => {
            warn!(shape_type = other, "skipping unsupported shape type");
            return Ok(None);
        }
    };
    Ok(Some(geometry))
}

/// Parts of a polyline or polygon record, one `LineString` each.
fn parse_parts(content: &[u8]) -> Result<Vec<LineString<f64>>, InputError> {
    let num_parts = count(le_i32(content, 36)?, "part count")?;
    let num_points = count(le_i32(content, 40)?, "point count")?;
    let parts_at = 44;
    let points_at = parts_at + 4 * num_parts;

    let starts = (0..num_parts)
        .map(|i| count(le_i32(content, parts_at + 4 * i)?, "part index"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut parts = Vec::with_capacity(num_parts);
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(num_points);
        if start > end || end > num_points {
            return Err(malformed(format!("part {i} spans {start}..{end} of {num_points} points")));
        }
        let coords = (start..end)
            .map(|j| coord_at(content, points_at + 16 * j))
            .collect::<Result<Vec<_>, _>>()?;
        parts.push(LineString(coords));
    }
    Ok(parts)
}

// ---------------------------------------------------------------------------
// .dbf
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DbfField {
    name: String,
    kind: u8,
    length: usize,
    decimals: u8,
}

/// Decode the rows of a dBase III table. Deleted rows are `None`.
///
/// # Errors
///
/// [`InputError::MalformedArchive`] when the header is truncated.
pub fn parse_dbf(bytes: &[u8]) -> Result<Vec<Option<Attributes>>, InputError> {
    let record_count = usize::try_from(le_u32(bytes, 4)?)
        .map_err(|_| malformed("dbf record count out of range"))?;
    let header_len = usize::from(le_u16(bytes, 8)?);
    let record_len = usize::from(le_u16(bytes, 10)?);
    if record_len == 0 && record_count > 0 {
        return Err(malformed("dbf record length is zero"));
    }

    let mut fields = Vec::new();
    let mut offset = 32;
    while offset + 32 <= header_len {
        let desc = bytes
            .get(offset..offset + 32)
            .ok_or_else(|| malformed("dbf field descriptors truncated"))?;
        if desc[0] == DBF_FIELD_TERMINATOR {
            break;
        }
        let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: String::from_utf8_lossy(&desc[..name_end]).trim().to_string(),
            kind: desc[11],
            length: usize::from(desc[16]),
            decimals: desc[17],
        });
        offset += 32;
    }

    let mut rows = Vec::with_capacity(record_count.min(bytes.len() / record_len.max(1)));
    for r in 0..record_count {
        let start = header_len + r * record_len;
        let Some(record) = bytes.get(start..start + record_len) else {
            warn!(expected = record_count, read = r, "dbf table truncated");
            break;
        };
        if record.first() == Some(&DBF_DELETED) {
            rows.push(None);
            continue;
        }

        let mut attrs = Attributes::new();
        let mut pos = 1;
        for field in &fields {
            let raw = record.get(pos..pos + field.length).unwrap_or_default();
            attrs.insert(field.name.clone(), field_value(field, raw));
            pos += field.length;
        }
        rows.push(Some(attrs));
    }
    Ok(rows)
}

fn field_value(field: &DbfField, raw: &[u8]) -> Value {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    match field.kind {
        b'N' | b'F' => {
            if text.is_empty() || text.starts_with('*') {
                return Value::Null;
            }
            if field.decimals == 0 {
                if let Ok(int) = text.parse::<i64>() {
                    return json!(int);
                }
            }
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map_or(Value::Null, |v| json!(v))
        }
        b'L' => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => Value::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => Value::Bool(false),
            _ => Value::Null,
        },
        b'D' if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) => {
            json!(format!("{}-{}-{}", &text[..4], &text[4..6], &text[6..]))
        }
        b'D' => Value::Null,
        _ => Value::String(text.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Sidecar file next to `shp` with extension `ext`, either case.
fn sidecar(shp: &Path, ext: &str) -> Option<PathBuf> {
    [ext.to_ascii_lowercase(), ext.to_ascii_uppercase()]
        .into_iter()
        .map(|e| shp.with_extension(e))
        .find(|p| p.is_file())
}

/// Read a shapefile and its `.dbf` / `.prj` sidecars into features.
///
/// # Errors
///
/// [`InputError::Io`] when a file cannot be read,
/// [`InputError::MalformedArchive`] when it cannot be decoded.
#[instrument(skip_all, fields(path = %shp.display()))]
pub fn read_shapefile(shp: &Path) -> Result<Vec<InputFeature>, InputError> {
    let geometries = parse_shp(&fs::read(shp)?)?;

    let rows = match sidecar(shp, "dbf") {
        Some(path) => parse_dbf(&fs::read(path)?)?,
        None => {
            warn!("no .dbf sidecar, features carry no attributes");
            Vec::new()
        }
    };
    let crs = match sidecar(shp, "prj") {
        Some(path) => Some(Crs::from_wkt(&fs::read_to_string(path)?)),
        None => {
            warn!("no .prj sidecar, source CRS unknown");
            None
        }
    };
    if let Some(crs) = &crs {
        debug!(%crs, "read projection");
    }

    let mut rows = rows.into_iter();
    let (mut null, mut deleted) = (0_usize, 0_usize);
    let mut features = Vec::with_capacity(geometries.len());
    for geometry in geometries {
        let properties = match rows.next() {
            Some(Some(attrs)) => attrs,
            Some(None) => {
                deleted += 1;
                continue;
            }
            None => Attributes::new(),
        };
        let Some(geometry) = geometry else {
            null += 1;
            continue;
        };
        features.push(InputFeature {
            geometry,
            properties,
            crs: crs.clone(),
        });
    }

    info!(features = features.len(), null, deleted, "read shapefile");
    Ok(features)
}
