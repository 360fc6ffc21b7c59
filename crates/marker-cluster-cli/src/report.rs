//! What the driver prints after each zoom step

use marker_cluster_lib::{BoundingBox, ClusterView, UpdateSummary};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub elements: usize,
    pub threshold_px: f64,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub zoom: f64,
    pub region: BoundingBox,
    /// Missing when the pass failed and nothing was applied
    pub pass: Option<PassReport>,
    pub markers: Vec<ClusterView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub pass: u64,
    pub zoom_change: String,
    pub added: usize,
    pub removed: usize,
    pub evicted: usize,
    pub absorbed: usize,
    pub created: usize,
    pub visible: usize,
    pub clusters: usize,
}

impl From<&UpdateSummary> for PassReport {
    fn from(summary: &UpdateSummary) -> Self {
        Self {
            pass: summary.pass,
            zoom_change: format!("{:?}", summary.stats.zoom_change),
            added: summary.stats.added,
            removed: summary.stats.removed,
            evicted: summary.stats.evicted,
            absorbed: summary.stats.absorbed,
            created: summary.stats.created,
            visible: summary.visible_count,
            clusters: summary.cluster_count,
        }
    }
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} elements, markers at least {}px apart",
            self.elements, self.threshold_px
        );
        for step in &self.steps {
            let region = &step.region;
            let _ = writeln!(
                out,
                "\nzoom {} over N{:.4} W{:.4} S{:.4} E{:.4}",
                step.zoom,
                region.north(),
                region.west(),
                region.south(),
                region.east()
            );
            match &step.pass {
                Some(pass) => {
                    let _ = writeln!(
                        out,
                        "  pass {} ({}): +{} -{} evicted {} absorbed {} created {}",
                        pass.pass,
                        pass.zoom_change,
                        pass.added,
                        pass.removed,
                        pass.evicted,
                        pass.absorbed,
                        pass.created
                    );
                    let _ = writeln!(
                        out,
                        "  {} visible elements in {} clusters",
                        pass.visible, pass.clusters
                    );
                }
                None => {
                    let _ = writeln!(out, "  pass failed, map unchanged");
                }
            }
            for marker in &step.markers {
                let _ = writeln!(
                    out,
                    "  {:>5} {:<24} {:<12} at {}",
                    marker.element_count, marker.title, marker.description, marker.position
                );
            }
        }
        out
    }
}
