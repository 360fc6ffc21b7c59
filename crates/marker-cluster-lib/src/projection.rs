//! Built-in Web Mercator projection onto a plain pixel canvas
//!
//! [`MercatorProjection`] fits a bounding box onto a `width × height` canvas with a
//! uniform scale, and [`MercatorAdapter`] implements [`MapAdapter`] on top of it while
//! keeping the markers in memory. Together they let the engine run without any map SDK,
//! e.g. in the command line driver or in tests.

use crate::{BoundingBox, ClusterView, GeoPoint, MapAdapter, Result, utils};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A geographic region mapped onto a pixel canvas
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MercatorProjection {
    bounds: BoundingBox,
    width: f64,
    height: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MercatorProjection {
    pub fn new(bounds: BoundingBox, width: f64, height: f64) -> Self {
        Self {
            bounds,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The region shown on the canvas
    #[inline]
    pub fn visible_region(&self) -> BoundingBox {
        self.bounds
    }

    /// Extent of the region in mercator meters (x, y)
    fn mercator_span(&self) -> (f64, f64) {
        let x = utils::wgs84_to_mercator(0.0, self.bounds.longitude_span()).x();
        let y = utils::wgs84_to_mercator(self.bounds.north(), 0.0).y()
            - utils::wgs84_to_mercator(self.bounds.south(), 0.0).y();
        (x, y)
    }

    /// Pixels per mercator meter; the smaller of both axes so nothing is cut off
    fn scale(&self) -> f64 {
        let (x_span, y_span) = self.mercator_span();
        let scale = (self.width / x_span).min(self.height / y_span);
        if scale.is_finite() { scale } else { 1.0 }
    }

    /// Canvas position of `point`, origin at the north-west corner, y pointing down
    pub fn coordinates(&self, point: GeoPoint) -> (f64, f64) {
        let scale = self.scale();
        let mut d_lng = point.lng - self.bounds.west();
        if self.bounds.crosses_antimeridian() && point.lng < 0.0 {
            // East of the dateline, continue counting from the west edge
            d_lng += 360.0;
        }
        let projected = utils::wgs84_to_mercator(point.lat, d_lng);
        let top = utils::wgs84_to_mercator(self.bounds.north(), 0.0).y();
        (projected.x() * scale, (top - projected.y()) * scale)
    }

    /// Euclidean distance between two positions on the canvas
    pub fn pixel_distance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let (ax, ay) = self.coordinates(a);
        let (bx, by) = self.coordinates(b);
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Grow the shorter axis of the region so it fills the canvas aspect ratio
    ///
    /// Longitudes pushed past ±180 are wrapped; latitudes are limited to the range
    /// Web Mercator can represent.
    pub fn fit_aspect(&self) -> Self {
        let (x_span, y_span) = self.mercator_span();
        if x_span <= 0.0 || y_span <= 0.0 || self.width <= 0.0 || self.height <= 0.0 {
            return *self;
        }

        let mut north = self.bounds.north();
        let mut south = self.bounds.south();
        let mut west = self.bounds.west();
        let mut east = self.bounds.east();

        if x_span / self.width > y_span / self.height {
            // Too wide for the canvas: add latitude
            let ratio = (x_span * self.height / self.width - y_span) / y_span;
            let grow = self.bounds.latitude_span() * ratio / 2.0;
            north = (north + grow).min(utils::MAX_LATITUDE);
            south = (south - grow).max(-utils::MAX_LATITUDE);
        } else {
            let ratio = (y_span * self.width / self.height - x_span) / x_span;
            let grow = self.bounds.longitude_span() * ratio / 2.0;
            west = utils::wrap_longitude(west - grow);
            east = utils::wrap_longitude(east + grow);
        }

        Self::new(
            BoundingBox::from_edges(north, west, south, east),
            self.width,
            self.height,
        )
    }

    /// Zoom the region around its center by `levels` (each level halves the extent)
    pub fn zoomed_by(&self, levels: f64) -> Self {
        let factor = 2f64.powf(levels);
        let center = self.bounds.center();
        let center_m = utils::wgs84_to_mercator(center.lat, 0.0);
        let (x_span, y_span) = self.mercator_span();
        let half_x = x_span / factor / 2.0;
        let half_y = y_span / factor / 2.0;

        let (north, _) = utils::mercator_to_wgs84(0.0, center_m.y() + half_y);
        let (south, _) = utils::mercator_to_wgs84(0.0, center_m.y() - half_y);
        let (_, half_lng) = utils::mercator_to_wgs84(half_x, 0.0);
        let half_lng = half_lng.min(180.0);

        Self::new(
            BoundingBox::from_edges(
                north.min(utils::MAX_LATITUDE),
                utils::wrap_longitude(center.lng - half_lng),
                south.max(-utils::MAX_LATITUDE),
                utils::wrap_longitude(center.lng + half_lng),
            ),
            self.width,
            self.height,
        )
    }
}

/// Handle of a marker kept by [`MercatorAdapter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerId(pub u64);

#[derive(Debug, Default)]
struct MarkerStore {
    next_id: u64,
    markers: BTreeMap<MarkerId, ClusterView>,
}

/// [`MapAdapter`] drawing onto an in-memory marker list
#[derive(Debug, Default)]
pub struct MercatorAdapter {
    store: Mutex<MarkerStore>,
}

impl MercatorAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, MarkerStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All markers currently drawn, ordered by creation
    pub fn markers(&self) -> Vec<(MarkerId, ClusterView)> {
        self.store()
            .markers
            .iter()
            .map(|(id, view)| (*id, view.clone()))
            .collect()
    }

    pub fn marker(&self, id: MarkerId) -> Option<ClusterView> {
        self.store().markers.get(&id).cloned()
    }

    pub fn marker_count(&self) -> usize {
        self.store().markers.len()
    }
}

impl MapAdapter for MercatorAdapter {
    type Viewport = MercatorProjection;
    type Bounds = BoundingBox;
    type Marker = MarkerId;

    fn visible_region(&self, viewport: &MercatorProjection) -> BoundingBox {
        viewport.visible_region()
    }

    fn bounds_contains(&self, bounds: &BoundingBox, point: GeoPoint) -> bool {
        bounds.contains(point)
    }

    fn pixel_distance(&self, a: GeoPoint, b: GeoPoint, viewport: &MercatorProjection) -> f64 {
        viewport.pixel_distance(a, b)
    }

    fn materialize_marker(&self, view: &ClusterView) -> Result<MarkerId> {
        let mut store = self.store();
        let id = MarkerId(store.next_id);
        store.next_id += 1;
        store.markers.insert(id, view.clone());
        Ok(id)
    }

    fn update_marker(&self, marker: &MarkerId, view: &ClusterView) -> Result<()> {
        let mut store = self.store();
        match store.markers.get_mut(marker) {
            Some(existing) => {
                *existing = view.clone();
                Ok(())
            }
            None => Err(crate::ClusterError::marker(format!(
                "unknown marker {}",
                marker.0
            ))),
        }
    }

    fn delete_marker(&self, marker: MarkerId) {
        if self.store().markers.remove(&marker).is_none() {
            tracing::debug!("Marker {} was already deleted", marker.0);
        }
    }
}
