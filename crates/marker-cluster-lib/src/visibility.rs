//! Detect elements entering or leaving the visible region
//!
//! Only two groups are inspected: elements currently outside the viewport, and members
//! of clusters whose centroid moved out of it. Elements of clusters that are still on
//! screen are assumed to stay visible until their cluster leaves.

use crate::{Cluster, ElementKey, GeoPoint};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Added,
    Removed,
}

/// Compute the visibility delta for one viewport
///
/// Invisible elements at the `(0, 0)` sentinel are never added. Clusters with a
/// non-finite centroid are logged and skipped.
pub fn detect_changes<M, F>(
    locations: &[GeoPoint],
    not_visible: &BTreeSet<ElementKey>,
    clusters: &[Cluster<M>],
    contains: F,
) -> BTreeMap<ElementKey, Visibility>
where
    F: Fn(GeoPoint) -> bool + Sync,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("visibility::detect_changes");

    let mut changes: BTreeMap<ElementKey, Visibility> = not_visible
        .par_iter()
        .filter(|key| {
            locations
                .get(key.index())
                .is_some_and(|point| !point.is_unknown() && contains(*point))
        })
        .map(|key| (*key, Visibility::Added))
        .collect();

    for cluster in clusters.iter().filter(|c| c.is_alive()) {
        let Some(center) = cluster.centroid() else {
            continue;
        };
        if !center.is_finite() {
            tracing::warn!("Cluster centroid is not finite ({center}), skipping it");
            continue;
        }
        if contains(center) {
            continue;
        }
        for (key, point) in cluster.members() {
            if !contains(*point) {
                changes.insert(*key, Visibility::Removed);
            }
        }
    }

    changes
}
