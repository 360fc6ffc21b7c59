//! Utility functions for coordinate conversions and spherical geometry

use crate::GeoPoint;
use geo::Point;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Millimeters per inch, for converting physical marker spacing to pixels
pub const MM_PER_INCH: f64 = 25.4;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Precomputed constant: 180.0 / EARTH_MERCATOR_MAX
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;

/// Precomputed constant: PI / EARTH_MERCATOR_MAX
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// # Arguments
/// * `lat` - Latitude in degrees (clamped to ±85.05)
/// * `lon` - Longitude in degrees (-180 to 180)
///
/// # Returns
/// A `Point<f64>` with x (easting) and y (northing) in meters
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters back to WGS84
///
/// # Returns
/// A tuple of (latitude, longitude) in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    (lat, lon)
}

/// Wrap a longitude into [-180, 180]
#[inline]
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Convert a physical distance in millimeters to whole device pixels
///
/// Fractional pixels are truncated, like platform dimension conversions do.
#[inline]
pub fn millimeters_to_pixels(mm: f64, xdpi: f64) -> f64 {
    (mm * xdpi / MM_PER_INCH).trunc()
}

/// Center of a point set on the sphere
///
/// Each point becomes a unit vector (using colatitude `90° - lat`), the vectors are
/// averaged and the mean direction is converted back to latitude/longitude. Unlike
/// averaging degrees this is stable near the poles and across the antimeridian.
///
/// Returns `None` for an empty set. When the vectors cancel out exactly, or an input is
/// not finite, the result contains NaN; callers must check [`GeoPoint::is_finite`].
pub fn spherical_centroid<I>(points: I) -> Option<GeoPoint>
where
    I: IntoIterator<Item = GeoPoint>,
{
    let (mut x, mut y, mut z) = (0.0_f64, 0.0_f64, 0.0_f64);
    let mut count = 0usize;

    for point in points {
        let colat = (90.0 - point.lat).to_radians();
        let lng = point.lng.to_radians();
        x += colat.sin() * lng.cos();
        y += colat.sin() * lng.sin();
        z += colat.cos();
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    let (x, y, z) = (x / n, y / n, z / n);
    let norm = (x * x + y * y + z * z).sqrt();

    let lat = 90.0 - (z / norm).acos().to_degrees();
    let lng = y.atan2(x).to_degrees();
    Some(GeoPoint::new(lat, lng))
}
