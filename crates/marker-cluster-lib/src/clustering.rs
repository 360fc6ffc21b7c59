//! Greedy clustering of visible elements and zoom-driven split/merge
//!
//! [`ClusterSet`] owns every cluster of one engine together with the element→cluster
//! index and the set of elements currently outside the viewport. One call to
//! [`ClusterSet::compute_pass`] performs the complete background part of an update:
//!
//! 1. detect which elements entered or left the visible region
//! 2. apply that delta
//! 3. refresh stale centroids
//! 4. split (zoom in) or merge (zoom out) clusters if the zoom changed
//! 5. assign new and evicted elements to the first cluster within the pixel threshold
//! 6. refresh stale centroids again
//!
//! Emptied clusters are left in place; [`ClusterSet::prune`] removes them during apply.

use crate::cluster::{Cluster, Members};
use crate::visibility::{self, Visibility};
use crate::{ElementKey, GeoPoint, MarkerColor};
use std::collections::{BTreeSet, HashMap};

/// Direction of a zoom transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomChange {
    /// First pass, the zoom level was only recorded
    Initial,
    Unchanged,
    In,
    Out,
}

impl ZoomChange {
    fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            None => ZoomChange::Initial,
            Some(previous) if current > previous => ZoomChange::In,
            Some(previous) if current < previous => ZoomChange::Out,
            Some(_) => ZoomChange::Unchanged,
        }
    }
}

/// What one compute pass changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub zoom_change: ZoomChange,
    /// Elements that entered the visible region
    pub added: usize,
    /// Elements that left the visible region
    pub removed: usize,
    /// Elements split off their cluster by zooming in
    pub evicted: usize,
    /// Clusters merged into another one by zooming out
    pub absorbed: usize,
    /// Clusters created for elements that fit no existing cluster
    pub created: usize,
}

impl PassStats {
    fn new(zoom_change: ZoomChange) -> Self {
        Self {
            zoom_change,
            added: 0,
            removed: 0,
            evicted: 0,
            absorbed: 0,
            created: 0,
        }
    }

    /// Whether the pass changed any cluster
    pub fn is_noop(&self) -> bool {
        self.added == 0
            && self.removed == 0
            && self.evicted == 0
            && self.absorbed == 0
            && self.created == 0
    }
}

/// All clusters of one engine plus the bookkeeping to keep them consistent
#[derive(Debug, Clone)]
pub struct ClusterSet<M> {
    clusters: Vec<Cluster<M>>,
    /// Visible element → index into `clusters`. Valid until the next prune.
    assignment: HashMap<ElementKey, usize>,
    not_visible: BTreeSet<ElementKey>,
    zoom: Option<f64>,
    default_color: MarkerColor,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<M> ClusterSet<M> {
    /// Start with every one of `element_count` elements outside the viewport
    pub fn new(element_count: usize, default_color: MarkerColor) -> Self {
        Self {
            clusters: Vec::new(),
            assignment: HashMap::with_capacity(element_count),
            not_visible: (0..element_count).map(ElementKey).collect(),
            zoom: None,
            default_color,
        }
    }

    /// All clusters, including emptied ones that have not been pruned yet
    pub fn clusters(&self) -> &[Cluster<M>] {
        &self.clusters
    }

    pub(crate) fn clusters_mut(&mut self) -> &mut [Cluster<M>] {
        &mut self.clusters
    }

    pub fn alive(&self) -> impl Iterator<Item = &Cluster<M>> {
        self.clusters.iter().filter(|cluster| cluster.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Number of elements currently assigned to a cluster
    pub fn visible_count(&self) -> usize {
        self.assignment.len()
    }

    pub fn not_visible(&self) -> &BTreeSet<ElementKey> {
        &self.not_visible
    }

    /// Zoom level recorded by the last pass
    pub fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    pub fn default_color(&self) -> MarkerColor {
        self.default_color
    }

    /// Index of the cluster holding `key`
    pub fn cluster_of(&self, key: ElementKey) -> Option<usize> {
        self.assignment.get(&key).copied()
    }

    pub fn get(&self, index: usize) -> Option<&Cluster<M>> {
        self.clusters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Cluster<M>> {
        self.clusters.get_mut(index)
    }

    /// Run the full background update for one viewport
    ///
    /// `locations` is indexed by [`ElementKey`], `contains` tests membership of the
    /// visible region and `distance` measures on-screen pixels between two points.
    pub fn compute_pass<C, D>(
        &mut self,
        locations: &[GeoPoint],
        contains: C,
        distance: D,
        threshold: f64,
        zoom: f64,
    ) -> PassStats
    where
        C: Fn(GeoPoint) -> bool + Sync,
        D: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let changes = visibility::detect_changes(locations, &self.not_visible, &self.clusters, contains);
        let zoom_change = ZoomChange::between(self.zoom, zoom);
        self.zoom = Some(zoom);
        let mut stats = PassStats::new(zoom_change);

        let mut incoming: Vec<(ElementKey, GeoPoint)> = Vec::new();
        for (key, change) in changes {
            match change {
                Visibility::Added => {
                    self.not_visible.remove(&key);
                    if let Some(point) = locations.get(key.index()) {
                        incoming.push((key, *point));
                    }
                    stats.added += 1;
                }
                Visibility::Removed => {
                    if let Some(index) = self.assignment.remove(&key) {
                        self.clusters[index].remove(key);
                    }
                    self.not_visible.insert(key);
                    stats.removed += 1;
                }
            }
        }
        self.refresh_dirty();

        match zoom_change {
            ZoomChange::In => {
                let evicted = self.split(&distance, threshold);
                stats.evicted = evicted.len();
                incoming.extend(evicted);
            }
            ZoomChange::Out => {
                stats.absorbed = self.merge(&distance, threshold);
            }
            ZoomChange::Initial | ZoomChange::Unchanged => {}
        }
        self.refresh_dirty();

        for (key, point) in incoming {
            if self.assign(key, point, &distance, threshold) {
                stats.created += 1;
            }
        }
        self.refresh_dirty();

        tracing::debug!(
            "Pass at zoom {zoom}: {zoom_change:?}, +{} -{} evicted {} absorbed {} created {}",
            stats.added,
            stats.removed,
            stats.evicted,
            stats.absorbed,
            stats.created
        );
        stats
    }

    /// Put an element into the first alive cluster within `threshold`, or a new one
    ///
    /// Clusters are scanned in list order and the first fit wins, even if a later
    /// cluster is closer. Returns true if a new cluster was created.
    pub fn assign<D>(&mut self, key: ElementKey, point: GeoPoint, distance: D, threshold: f64) -> bool
    where
        D: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let target = self.clusters.iter().position(|cluster| {
            cluster
                .finite_centroid()
                .is_some_and(|center| cluster.is_alive() && distance(point, center) <= threshold)
        });

        match target {
            Some(index) => {
                let cluster = &mut self.clusters[index];
                cluster.insert(key, point);
                cluster.refresh();
                self.assignment.insert(key, index);
                false
            }
            None => {
                self.assignment.insert(key, self.clusters.len());
                self.clusters
                    .push(Cluster::singleton(key, point, self.default_color));
                true
            }
        }
    }

    /// Zoom in: evict members that are now too far from their cluster's centroid
    fn split<D>(&mut self, distance: &D, threshold: f64) -> Members
    where
        D: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let mut evicted = Members::new();
        for cluster in self.clusters.iter_mut().filter(|c| c.is_alive()) {
            let removed = cluster.evict_beyond(distance, threshold);
            for (key, _) in &removed {
                self.assignment.remove(key);
            }
            evicted.extend(removed);
            cluster.refresh();
        }
        evicted
    }

    /// Zoom out: fold every later cluster within `threshold` into the earlier one
    ///
    /// Cluster `i` is compared using its centroid from before the scan; absorbed clusters
    /// are left empty for the prune pass. Returns the number of absorbed clusters.
    fn merge<D>(&mut self, distance: &D, threshold: f64) -> usize
    where
        D: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let mut absorbed = 0;
        for i in 0..self.clusters.len() {
            if !self.clusters[i].is_alive() {
                continue;
            }
            let Some(center) = self.usable_centroid(i) else {
                continue;
            };
            for j in (i + 1)..self.clusters.len() {
                if !self.clusters[j].is_alive() {
                    continue;
                }
                let Some(other) = self.usable_centroid(j) else {
                    continue;
                };
                if distance(center, other) > threshold {
                    continue;
                }
                let members = self.clusters[j].take_members();
                for (key, _) in &members {
                    self.assignment.insert(*key, i);
                }
                self.clusters[i].absorb(members);
                absorbed += 1;
            }
        }
        absorbed
    }

    fn usable_centroid(&self, index: usize) -> Option<GeoPoint> {
        let centroid = self.clusters[index].centroid()?;
        if centroid.is_finite() {
            Some(centroid)
        } else {
            tracing::warn!("Cluster {index} has a non-finite centroid, skipping it");
            None
        }
    }

    fn refresh_dirty(&mut self) {
        for cluster in self.clusters.iter_mut().filter(|c| c.is_dirty()) {
            cluster.refresh();
        }
    }

    /// Remove emptied clusters and return their marker handles
    ///
    /// Rebuilds the element→cluster index, since indices shift.
    pub fn prune(&mut self) -> Vec<M> {
        let mut released = Vec::new();
        self.clusters.retain_mut(|cluster| {
            if cluster.is_alive() {
                true
            } else {
                released.extend(cluster.take_marker());
                false
            }
        });

        self.assignment.clear();
        for (index, cluster) in self.clusters.iter().enumerate() {
            for key in cluster.element_keys() {
                self.assignment.insert(key, index);
            }
        }
        released
    }
}
