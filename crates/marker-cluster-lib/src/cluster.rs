//! A single on-screen cluster and the views handed to render adapters

use crate::{ElementKey, GeoPoint, MapElement, utils};
use smallvec::SmallVec;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Members stored inline; most clusters on a zoomed-in map hold a handful of elements
pub(crate) type Members = SmallVec<[(ElementKey, GeoPoint); 4]>;

/// Marker colors every adapter has to support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarkerColor {
    #[default]
    Blue,
    Green,
    Red,
    Yellow,
}

impl MarkerColor {
    /// Opaque RGBA value of the color
    pub fn rgba(self) -> [u8; 4] {
        match self {
            MarkerColor::Blue => [0, 0, 255, 255],
            MarkerColor::Green => [0, 255, 0, 255],
            MarkerColor::Red => [255, 0, 0, 255],
            MarkerColor::Yellow => [255, 255, 0, 255],
        }
    }
}

/// A group of elements drawn as one marker
///
/// Membership changes mark the cluster `dirty` (centroid stale) and `touched` (marker
/// must be re-rendered). The centroid is only meaningful while the cluster is not dirty.
#[derive(Debug, Clone)]
pub struct Cluster<M> {
    members: Members,
    centroid: Option<GeoPoint>,
    dirty: bool,
    touched: bool,
    color: MarkerColor,
    cursor: Option<usize>,
    marker: Option<M>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<M> Cluster<M> {
    /// A new cluster holding exactly one element, centroid already computed
    pub fn singleton(key: ElementKey, point: GeoPoint, color: MarkerColor) -> Self {
        let mut members = Members::new();
        members.push((key, point));
        Self {
            members,
            centroid: Some(point),
            dirty: false,
            touched: true,
            color,
            cursor: None,
            marker: None,
        }
    }

    /// Alive clusters have at least one member; empty ones wait for the prune pass
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.members.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members with their positions, in insertion order
    #[inline]
    pub fn members(&self) -> &[(ElementKey, GeoPoint)] {
        &self.members
    }

    pub fn element_keys(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.members.iter().map(|(key, _)| *key)
    }

    pub fn contains_key(&self, key: ElementKey) -> bool {
        self.members.iter().any(|(k, _)| *k == key)
    }

    /// Cached centroid. `None` for empty clusters, possibly NaN after degenerate input.
    #[inline]
    pub fn centroid(&self) -> Option<GeoPoint> {
        self.centroid
    }

    /// Cached centroid if it is usable for distance computations
    #[inline]
    pub fn finite_centroid(&self) -> Option<GeoPoint> {
        self.centroid.filter(GeoPoint::is_finite)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    #[inline]
    pub fn color(&self) -> MarkerColor {
        self.color
    }

    #[inline]
    pub fn marker(&self) -> Option<&M> {
        self.marker.as_ref()
    }

    /// Position of the in-cluster cursor, `None` until it was first advanced
    #[inline]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn insert(&mut self, key: ElementKey, point: GeoPoint) {
        self.members.push((key, point));
        self.membership_changed();
    }

    /// Remove a member. Returns false if the element was not part of this cluster.
    pub fn remove(&mut self, key: ElementKey) -> bool {
        match self.members.iter().position(|(k, _)| *k == key) {
            Some(index) => {
                self.members.remove(index);
                self.membership_changed();
                true
            }
            None => false,
        }
    }

    /// Remove and return all members farther than `threshold` from the centroid
    pub fn evict_beyond<F>(&mut self, distance: F, threshold: f64) -> Members
    where
        F: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let Some(center) = self.finite_centroid() else {
            return Members::new();
        };
        let mut evicted = Members::new();
        self.members.retain(|(key, point)| {
            if distance(*point, center) > threshold {
                evicted.push((*key, *point));
                false
            } else {
                true
            }
        });
        if !evicted.is_empty() {
            self.membership_changed();
        }
        evicted
    }

    /// Remove and return every member, leaving the cluster empty
    pub fn take_members(&mut self) -> Members {
        if self.members.is_empty() {
            return Members::new();
        }
        self.membership_changed();
        std::mem::take(&mut self.members)
    }

    pub fn absorb(&mut self, members: Members) {
        if members.is_empty() {
            return;
        }
        self.members.extend(members);
        self.membership_changed();
    }

    /// Recompute the centroid if membership changed since the last refresh
    pub fn refresh(&mut self) -> Option<GeoPoint> {
        if self.dirty {
            self.centroid = utils::spherical_centroid(self.members.iter().map(|(_, p)| *p));
            self.dirty = false;
        }
        self.centroid
    }

    pub fn set_color(&mut self, color: MarkerColor) {
        if self.color != color {
            self.color = color;
            self.touched = true;
        }
    }

    /// Step the in-cluster cursor forward, wrapping around, and return the new element
    pub fn advance_cursor(&mut self) -> Option<ElementKey> {
        if self.members.is_empty() {
            return None;
        }
        let next = match self.cursor {
            Some(cursor) if cursor + 1 < self.members.len() => cursor + 1,
            _ => 0,
        };
        self.cursor = Some(next);
        self.touched = true;
        Some(self.members[next].0)
    }

    /// Element under the cursor; the first member before the cursor was moved
    pub fn current_element(&self) -> Option<ElementKey> {
        self.members
            .get(self.cursor.unwrap_or(0))
            .map(|(key, _)| *key)
    }

    pub fn set_marker(&mut self, marker: M) {
        self.marker = Some(marker);
    }

    pub fn take_marker(&mut self) -> Option<M> {
        self.marker.take()
    }

    /// Clear `touched` once the adapter has rendered the current state
    pub fn mark_rendered(&mut self) {
        self.touched = false;
    }

    fn membership_changed(&mut self) {
        self.dirty = true;
        self.touched = true;
        // Indices shift on membership changes; start over rather than point elsewhere
        self.cursor = None;
    }
}

impl<M: Clone> Cluster<M> {
    pub fn snapshot(&self) -> ClusterSnapshot<M> {
        ClusterSnapshot {
            centroid: self.centroid,
            elements: self.element_keys().collect(),
            color: self.color,
            marker: self.marker.clone(),
        }
    }
}

/// Everything a render adapter needs to draw one marker
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterView {
    pub position: GeoPoint,
    pub color: MarkerColor,
    pub element_count: usize,
    /// Marker title: the element id for single elements, a count otherwise
    pub title: String,
    /// Marker description: the sort key for single elements, `cursor/count` otherwise
    pub description: String,
}

impl ClusterView {
    /// Describe a cluster, looking up member details in the registered element list
    pub fn of_cluster<M, E: MapElement>(cluster: &Cluster<M>, elements: &[Arc<E>]) -> Self {
        let position = cluster.centroid().unwrap_or_default();
        let count = cluster.len();
        if count == 1 {
            let element = cluster
                .current_element()
                .and_then(|key| elements.get(key.index()));
            return Self {
                position,
                color: cluster.color(),
                element_count: 1,
                title: element.and_then(|e| e.id()).unwrap_or_default().to_string(),
                description: element
                    .and_then(|e| e.sort_key())
                    .unwrap_or_default()
                    .to_string(),
            };
        }
        let shown = cluster.cursor().map_or(0, |cursor| cursor + 1);
        Self {
            position,
            color: cluster.color(),
            element_count: count,
            title: format!("{count} elements"),
            description: format!("{shown}/{count}"),
        }
    }

    /// Describe a pinned single element
    pub fn of_element<E: MapElement + ?Sized>(element: &E, color: MarkerColor) -> Self {
        Self {
            position: element.location(),
            color,
            element_count: 1,
            title: element.id().unwrap_or_default().to_string(),
            description: element.sort_key().unwrap_or_default().to_string(),
        }
    }
}

/// Read-only copy of a cluster, handed out by [`MarkerEngine::clusters`](crate::MarkerEngine::clusters)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterSnapshot<M> {
    pub centroid: Option<GeoPoint>,
    pub elements: Vec<ElementKey>,
    pub color: MarkerColor,
    pub marker: Option<M>,
}
