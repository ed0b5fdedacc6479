//! Street networks for a named place.

pub mod file;
pub mod overpass;

use geo::{HaversineDistance, Point};

/// Great-circle distance in metres between two `(lon, lat)` positions.
#[must_use]
pub fn haversine_metres(a: (f64, f64), b: (f64, f64)) -> f64 {
    Point::new(a.0, a.1).haversine_distance(&Point::new(b.0, b.1))
}
