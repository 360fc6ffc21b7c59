//! Antimeridian-aware latitude/longitude bounding boxes
//!
//! A box is described by its north-west and south-east corners. When the west edge lies
//! east of the east edge (`west > east`) the box wraps across the ±180° meridian. That is
//! a valid box, not an error, and every operation here handles it.

use crate::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fraction of the span added on every side by [`BoundingBox::add_padding`]
const PADDING_FRACTION: f64 = 0.1;

/// A latitude/longitude rectangle that may cross the antimeridian
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    north_west: GeoPoint,
    south_east: GeoPoint,
}

impl BoundingBox {
    /// Create a box from its north-west and south-east corners
    pub fn new(north_west: GeoPoint, south_east: GeoPoint) -> Self {
        debug_assert!(
            north_west.lat >= south_east.lat,
            "north edge must not be below the south edge"
        );
        Self {
            north_west,
            south_east,
        }
    }

    /// Create a box from edge values
    pub fn from_edges(north: f64, west: f64, south: f64, east: f64) -> Self {
        Self::new(GeoPoint::new(north, west), GeoPoint::new(south, east))
    }

    /// Degenerate box covering exactly one point
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            north_west: point,
            south_east: point,
        }
    }

    /// Smallest box (as grown by [`include`](Self::include)) covering all points.
    ///
    /// Returns `None` for an empty iterator.
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut points = points.into_iter();
        let mut bounds = Self::from_point(points.next()?);
        for point in points {
            bounds.include(point);
        }
        Some(bounds)
    }

    #[inline]
    pub fn north_west(&self) -> GeoPoint {
        self.north_west
    }

    #[inline]
    pub fn south_east(&self) -> GeoPoint {
        self.south_east
    }

    #[inline]
    pub fn north(&self) -> f64 {
        self.north_west.lat
    }

    #[inline]
    pub fn south(&self) -> f64 {
        self.south_east.lat
    }

    #[inline]
    pub fn west(&self) -> f64 {
        self.north_west.lng
    }

    #[inline]
    pub fn east(&self) -> f64 {
        self.south_east.lng
    }

    /// Whether the box wraps across the antimeridian
    #[inline]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west() > self.east()
    }

    /// Longitude extent in degrees, measured eastwards from the west edge
    pub fn longitude_span(&self) -> f64 {
        let span = self.east() - self.west();
        if span < 0.0 {
            (180.0 - self.west()) + self.east() + 180.0
        } else {
            span
        }
    }

    /// Latitude extent in degrees
    #[inline]
    pub fn latitude_span(&self) -> f64 {
        (self.north() - self.south()).abs()
    }

    /// Whether `point` lies inside the box (edges inclusive)
    pub fn contains(&self, point: GeoPoint) -> bool {
        if self.crosses_antimeridian() {
            if point.lng > 0.0 {
                // Eastern hemisphere part, between the west edge and +180
                if point.lng < self.west() {
                    return false;
                }
            } else if point.lng > self.east() {
                // Western hemisphere part, between -180 and the east edge
                return false;
            }
        } else if point.lng < self.west() || point.lng > self.east() {
            return false;
        }

        point.lat <= self.north() && point.lat >= self.south()
    }

    /// Grow the box just enough to cover `point`
    ///
    /// Latitude is extended first. If the point is still outside, the longitude edge that
    /// needs the smaller angular move (measured across the antimeridian when shorter) is
    /// moved onto the point.
    pub fn include(&mut self, point: GeoPoint) {
        if self.contains(point) {
            return;
        }
        if point.lat > self.north() {
            self.north_west.lat = point.lat;
        }
        if point.lat < self.south() {
            self.south_east.lat = point.lat;
        }
        if self.contains(point) {
            return;
        }

        let mut east_delta = (self.east() - point.lng).abs();
        let mut west_delta = (self.west() - point.lng).abs();
        let mut wrapped = false;
        if east_delta > 180.0 {
            east_delta = 360.0 - east_delta;
            wrapped = true;
        }
        if west_delta > 180.0 {
            west_delta = 360.0 - west_delta;
            wrapped = true;
        }

        if east_delta == west_delta {
            let past_east = point.lng > self.east();
            // Across the antimeridian "past the east edge" is reached by moving west
            if past_east != wrapped {
                self.south_east.lng = point.lng;
            } else {
                self.north_west.lng = point.lng;
            }
            return;
        }

        if east_delta > west_delta {
            self.north_west.lng = point.lng;
        } else {
            self.south_east.lng = point.lng;
        }
    }

    /// Grow the box by 10% of its span on every side
    ///
    /// Longitudes pushed outside ±180 are folded back with the same arithmetic the
    /// provider projections use; latitudes are not clamped.
    pub fn add_padding(&mut self) {
        let lng_span = self.longitude_span();
        let lat_span = self.latitude_span();

        self.north_west.lat += lat_span * PADDING_FRACTION;
        self.south_east.lat -= lat_span * PADDING_FRACTION;
        self.north_west.lng -= lng_span * PADDING_FRACTION;
        self.south_east.lng += lng_span * PADDING_FRACTION;

        // Below -180 this folds to 360 - lng, a true wrap only close to the meridian
        if self.south_east.lng < -180.0 {
            self.south_east.lng = 180.0 - self.south_east.lng + 180.0;
        }
        if self.north_west.lng < -180.0 {
            self.north_west.lng = 180.0 - self.north_west.lng + 180.0;
        }
        if self.south_east.lng > 180.0 {
            self.south_east.lng = -180.0 + (self.south_east.lng - 180.0);
        }
        if self.north_west.lng > 180.0 {
            self.north_west.lng = -180.0 + (self.north_west.lng - 180.0);
        }
    }

    /// Center of the box, antimeridian aware
    pub fn center(&self) -> GeoPoint {
        let lat = (self.north() + self.south()) / 2.0;
        let mut lng = self.west() + self.longitude_span() / 2.0;
        if lng > 180.0 {
            lng -= 360.0;
        }
        GeoPoint::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    #[test]
    fn test_contains_regular_box() {
        let bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 20.0);
        assert!(bounds.contains(p(45.0, 15.0)));
        assert!(bounds.contains(p(50.0, 10.0))); // edges are inclusive
        assert!(bounds.contains(p(40.0, 20.0)));
        assert!(!bounds.contains(p(45.0, 9.9)));
        assert!(!bounds.contains(p(45.0, 20.1)));
        assert!(!bounds.contains(p(50.1, 15.0)));
        assert!(!bounds.contains(p(39.9, 15.0)));
    }

    #[test]
    fn test_contains_across_antimeridian() {
        // From 170E over the dateline to 170W
        let bounds = BoundingBox::from_edges(10.0, 170.0, -10.0, -170.0);
        assert!(bounds.crosses_antimeridian());

        // Both sides of the dateline are inside
        assert!(bounds.contains(p(0.0, 175.0)));
        assert!(bounds.contains(p(0.0, 180.0)));
        assert!(bounds.contains(p(0.0, -175.0)));
        assert!(bounds.contains(p(0.0, -180.0)));

        // Strictly outside
        assert!(!bounds.contains(p(0.0, 165.0)));
        assert!(!bounds.contains(p(0.0, -165.0)));
        assert!(!bounds.contains(p(0.0, 0.0)));
        assert!(!bounds.contains(p(11.0, 175.0)));
        assert!(!bounds.contains(p(-11.0, -175.0)));
    }

    #[test]
    fn test_include_already_contained_is_noop() {
        let mut bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 20.0);
        let before = bounds;
        bounds.include(p(45.0, 15.0));
        assert_eq!(bounds, before);
    }

    #[test]
    fn test_include_extends_latitude_only() {
        let mut bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 20.0);
        bounds.include(p(55.0, 15.0));
        assert_eq!(bounds.north(), 55.0);
        assert_eq!(bounds.south(), 40.0);
        assert_eq!(bounds.west(), 10.0);
        assert_eq!(bounds.east(), 20.0);

        bounds.include(p(30.0, 12.0));
        assert_eq!(bounds.south(), 30.0);
    }

    #[test]
    fn test_include_extends_nearest_longitude_edge() {
        let mut bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 20.0);
        bounds.include(p(45.0, 25.0));
        assert_eq!(bounds.east(), 25.0);
        assert_eq!(bounds.west(), 10.0);

        bounds.include(p(45.0, 5.0));
        assert_eq!(bounds.west(), 5.0);
        assert_eq!(bounds.east(), 25.0);
    }

    #[test]
    fn test_include_wraps_across_antimeridian_when_shorter() {
        let mut bounds = BoundingBox::from_edges(10.0, 160.0, -10.0, 170.0);
        // Moving the east edge across the dateline costs 15 degrees, the west edge 25
        bounds.include(p(0.0, -175.0));
        assert_eq!(bounds.west(), 160.0);
        assert_eq!(bounds.east(), -175.0);
        assert!(bounds.crosses_antimeridian());
        assert!(bounds.contains(p(0.0, 179.0)));
        assert!(bounds.contains(p(0.0, -179.0)));
    }

    #[test]
    fn test_include_tie_without_wrap() {
        // A point equally far from both edges, east of the box
        let mut bounds = BoundingBox::from_point(p(0.0, 0.0));
        bounds.include(p(0.0, 10.0));
        assert_eq!(bounds.east(), 10.0);
        assert_eq!(bounds.west(), 0.0);

        // ... and west of the box
        let mut bounds = BoundingBox::from_point(p(0.0, 0.0));
        bounds.include(p(0.0, -10.0));
        assert_eq!(bounds.west(), -10.0);
        assert_eq!(bounds.east(), 0.0);
    }

    #[test]
    fn test_include_tie_with_wrap() {
        // Both deltas wrap to 10 degrees
        let mut bounds = BoundingBox::from_point(p(0.0, 175.0));
        bounds.include(p(0.0, -175.0));
        // Point lies "west" numerically, but across the dateline it is east of the box
        assert_eq!(bounds.west(), 175.0);
        assert_eq!(bounds.east(), -175.0);
        assert!(bounds.contains(p(0.0, 179.9)));
    }

    #[test]
    fn test_around() {
        assert!(BoundingBox::around(std::iter::empty()).is_none());

        let bounds = BoundingBox::around([p(40.0, 20.0), p(44.0, 21.0), p(15.0, 4.0)]).unwrap();
        assert_eq!(bounds.north(), 44.0);
        assert_eq!(bounds.south(), 15.0);
        assert_eq!(bounds.west(), 4.0);
        assert_eq!(bounds.east(), 21.0);
    }

    #[test]
    fn test_longitude_span() {
        assert_eq!(
            BoundingBox::from_edges(1.0, 10.0, 0.0, 30.0).longitude_span(),
            20.0
        );
        assert_eq!(
            BoundingBox::from_edges(1.0, 170.0, 0.0, -170.0).longitude_span(),
            20.0
        );
    }

    #[test]
    fn test_add_padding() {
        let mut bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 30.0);
        bounds.add_padding();
        assert!((bounds.north() - 51.0).abs() < 1e-9);
        assert!((bounds.south() - 39.0).abs() < 1e-9);
        assert!((bounds.west() - 8.0).abs() < 1e-9);
        assert!((bounds.east() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_padding_folds_past_antimeridian() {
        let mut bounds = BoundingBox::from_edges(10.0, 160.0, -10.0, 179.0);
        bounds.add_padding();
        // 179 + 1.9 = 180.9 folds to -179.1
        assert!((bounds.east() - (-179.1)).abs() < 1e-9);
        assert!((bounds.west() - 158.1).abs() < 1e-9);
        assert!(bounds.crosses_antimeridian());
    }

    #[test]
    fn test_add_padding_below_minus_180_keeps_observed_formula() {
        let mut bounds = BoundingBox::from_edges(10.0, -179.0, -10.0, -160.0);
        bounds.add_padding();
        // -179 - 1.9 = -180.9, then 360 - (-180.9) = 540.9, then 540.9 - 360 = 180.9
        assert!((bounds.west() - 180.9).abs() < 1e-9);
    }

    #[test]
    fn test_center() {
        let bounds = BoundingBox::from_edges(50.0, 10.0, 40.0, 30.0);
        assert_eq!(bounds.center(), p(45.0, 20.0));

        let wrapped = BoundingBox::from_edges(10.0, 170.0, -10.0, -170.0);
        let center = wrapped.center();
        assert_eq!(center.lat, 0.0);
        assert!((center.lng.abs() - 180.0).abs() < 1e-9);
    }
}
