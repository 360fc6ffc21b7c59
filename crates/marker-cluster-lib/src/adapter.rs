//! The seam between the engine and a concrete map provider

use crate::{ClusterView, GeoPoint, Result};
use std::hash::Hash;

/// Projection and rendering capabilities of one map provider
///
/// Projection methods are called from the background worker during the compute phase;
/// marker methods are only called from the dispatcher's thread during the apply phase.
pub trait MapAdapter: Send + Sync + 'static {
    /// Whatever describes the current camera (projection, zoom, canvas size)
    type Viewport: Send + 'static;
    /// Geographic region covered by a viewport
    type Bounds: Send + Sync + 'static;
    /// Handle of a marker drawn on the map
    type Marker: Clone + Eq + Hash + Send + Sync + std::fmt::Debug + 'static;

    /// Region currently on screen. Called on the thread that requested the update.
    fn visible_region(&self, viewport: &Self::Viewport) -> Self::Bounds;

    fn bounds_contains(&self, bounds: &Self::Bounds, point: GeoPoint) -> bool;

    /// On-screen distance between two positions, in pixels
    fn pixel_distance(&self, a: GeoPoint, b: GeoPoint, viewport: &Self::Viewport) -> f64;

    /// Draw a new marker
    fn materialize_marker(&self, view: &ClusterView) -> Result<Self::Marker>;

    /// Move or restyle an existing marker
    fn update_marker(&self, marker: &Self::Marker, view: &ClusterView) -> Result<()>;

    fn delete_marker(&self, marker: Self::Marker);
}
