//! Coordinate reference systems and reprojection to WGS 84.
//!
//! Only the systems street networks are commonly delivered in are
//! recognized: geographic WGS 84, spherical Web Mercator and the WGS 84 UTM
//! zones. Anything else is carried as [`Crs::Other`] and left unprojected.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

use geo::Coord;

/// WGS 84 semi-major axis in metres.
const WGS84_A: f64 = 6_378_137.0;
/// WGS 84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central-meridian scale factor.
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326 / OGC CRS84, axis order longitude, latitude.
    Wgs84,
    /// EPSG:3857 spherical Web Mercator.
    WebMercator,
    /// WGS 84 / UTM zone, EPSG:326zz (north) or EPSG:327zz (south).
    Utm { zone: u8, north: bool },
    /// A reference that was declared but is not supported.
    Other(String),
}

impl Crs {
    /// Parse an identifier such as `EPSG:32644`, `urn:ogc:def:crs:EPSG::3857`
    /// or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    #[must_use]
    pub fn from_identifier(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Self::Wgs84;
        }
        if upper.contains("EPSG") {
            let digits = upper
                .rsplit([':', '/'])
                .next()
                .and_then(|tail| tail.trim().parse::<u32>().ok());
            if let Some(code) = digits {
                return Self::from_epsg(code).unwrap_or_else(|| Self::Other(raw.trim().to_string()));
            }
        }
        Self::Other(raw.trim().to_string())
    }

    /// Map an EPSG code to a supported CRS.
    #[must_use]
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Self::Wgs84),
            3857 | 3785 | 900_913 | 102_100 => Some(Self::WebMercator),
            32601..=32660 => u8::try_from(code - 32600)
                .ok()
                .map(|zone| Self::Utm { zone, north: true }),
            32701..=32760 => u8::try_from(code - 32700)
                .ok()
                .map(|zone| Self::Utm { zone, north: false }),
            _ => None,
        }
    }

    /// Parse the WKT found in a shapefile `.prj` sidecar.
    ///
    /// The outermost `AUTHORITY["EPSG", …]` wins when present; otherwise the
    /// projection name is matched.
    #[must_use]
    pub fn from_wkt(wkt: &str) -> Self {
        let upper = wkt.to_ascii_uppercase();

        if let Some(crs) = last_epsg_authority(&upper).and_then(Self::from_epsg) {
            return crs;
        }

        let normalized = upper.replace('_', " ");
        if normalized.contains("PSEUDO MERCATOR") || normalized.contains("WEB MERCATOR") {
            return Self::WebMercator;
        }
        if normalized.contains("WGS 1984") || normalized.contains("WGS 84") || normalized.contains("WGS84") {
            if let Some(utm) = utm_from_name(&normalized) {
                return utm;
            }
            if normalized.trim_start().starts_with("GEOGCS") {
                return Self::Wgs84;
            }
        }
        Self::Other(wkt.trim().to_string())
    }

    #[must_use]
    pub const fn is_geographic(&self) -> bool {
        matches!(self, Self::Wgs84)
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Self::Wgs84 => Some(4326),
            Self::WebMercator => Some(3857),
            Self::Utm { zone, north: true } => Some(32600 + u32::from(*zone)),
            Self::Utm { zone, north: false } => Some(32700 + u32::from(*zone)),
            Self::Other(_) => None,
        }
    }

    /// Reproject one coordinate to WGS 84 `(lon, lat)` degrees.
    ///
    /// Returns `None` for unsupported systems or when the result is not
    /// finite.
    #[must_use]
    pub fn to_wgs84(&self, c: Coord<f64>) -> Option<Coord<f64>> {
        let out = match self {
            Self::Wgs84 => c,
            Self::WebMercator => web_mercator_inverse(c),
            Self::Utm { zone, north } => utm_inverse(c, *zone, *north),
            Self::Other(_) => return None,
        };
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => match self {
                Self::Other(raw) => write!(f, "{raw}"),
                _ => write!(f, "unknown"),
            },
        }
    }
}

fn web_mercator_inverse(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / WGS84_A).to_degrees(),
        y: (2.0f64.mul_add((c.y / WGS84_A).exp().atan(), -FRAC_PI_2)).to_degrees(),
    }
}

/// Inverse transverse Mercator on the WGS 84 ellipsoid (Snyder, USGS PP 1395).
#[allow(clippy::many_single_char_names, clippy::suboptimal_flops)]
fn utm_inverse(c: Coord<f64>, zone: u8, north: bool) -> Coord<f64> {
    let a = WGS84_A;
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let ep2 = e2 / (1.0 - e2);
    let x = c.x - UTM_FALSE_EASTING;
    let y = if north { c.y } else { c.y - UTM_FALSE_NORTHING_SOUTH };

    let m = y / UTM_K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = phi1.tan();
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * UTM_K0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon0 = (f64::from(zone) - 1.0).mul_add(6.0, -180.0 + 3.0).to_radians();
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
                / 120.0)
            / cos1;

    Coord {
        x: normalize_lon(lon).to_degrees(),
        y: lat.to_degrees(),
    }
}

fn normalize_lon(lon: f64) -> f64 {
    if lon > PI {
        lon - TAU
    } else if lon < -PI {
        lon + TAU
    } else {
        lon
    }
}

/// Code of the last `AUTHORITY["EPSG","n"]` in upper-cased WKT.
fn last_epsg_authority(upper: &str) -> Option<u32> {
    let start = upper.rfind("AUTHORITY[\"EPSG\"")?;
    upper[start..]
        .split('"')
        .nth(3)
        .and_then(|code| code.trim().parse().ok())
}

/// Match names like `WGS 84 / UTM zone 44N` or `WGS_1984_UTM_Zone_44N`.
fn utm_from_name(normalized: &str) -> Option<Crs> {
    let idx = normalized.find("UTM ZONE ")?;
    let rest = &normalized[idx + "UTM ZONE ".len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let zone: u8 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }
    let north = !matches!(rest[digits.len()..].chars().next(), Some('S'));
    Some(Crs::Utm { zone, north })
}
