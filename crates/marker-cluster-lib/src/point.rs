//! Geographic point type shared by all geometry and clustering code

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees
///
/// Equality is exact value equality. The origin `(0, 0)` doubles as the "no location"
/// marker: elements placed there are never considered visible.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lng: f64,
}

impl GeoPoint {
    /// The "no location" sentinel
    pub const UNKNOWN: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether this point is the `(0, 0)` "no location" sentinel
    // TODO: replace with an explicit optional location on `MapElement` once callers can
    // express it; until then (0, 0) cannot be placed on the map.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Whether both coordinates are finite numbers
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Planar distance in degrees. Only meaningful for tests and simple projections.
    #[inline]
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        (d_lat * d_lat + d_lng * d_lng).sqrt()
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    /// `geo` stores x = longitude, y = latitude
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.lng, point.lat)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lat:{} lng:{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(GeoPoint::new(0.0, 0.0).is_unknown());
        assert!(!GeoPoint::new(0.0, 0.1).is_unknown());
        assert!(!GeoPoint::new(-0.1, 0.0).is_unknown());
    }

    #[test]
    fn test_geo_point_conversion_axis_order() {
        let point = GeoPoint::from(geo::Point::new(13.4, 52.5));
        assert_eq!(point.lat, 52.5);
        assert_eq!(point.lng, 13.4);

        let back: geo::Point<f64> = point.into();
        assert_eq!(back.x(), 13.4);
        assert_eq!(back.y(), 52.5);
    }

    #[test]
    fn test_is_finite() {
        assert!(GeoPoint::new(10.0, 20.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, 20.0).is_finite());
        assert!(!GeoPoint::new(10.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_degree_distance() {
        let a = GeoPoint::new(40.0, 20.0);
        let b = GeoPoint::new(43.0, 24.0);
        assert!((a.degree_distance(&b) - 5.0).abs() < 1e-12);
    }
}
