//! Adapters and elements shared by the engine tests
//!
//! [`DummyAdapter`] measures "pixels" as the planar distance in degrees times the scale
//! factor carried by the viewport, so zooming is simulated by changing that factor.

use crate::{ClusterError, ClusterView, GeoPoint, MapAdapter, MapElement, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Clone)]
pub struct TestElement {
    pub id: Option<String>,
    pub at: GeoPoint,
}

impl TestElement {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            id: None,
            at: GeoPoint::new(lat, lng),
        }
    }

    pub fn with_id(id: &str, lat: f64, lng: f64) -> Self {
        Self {
            id: Some(id.to_string()),
            at: GeoPoint::new(lat, lng),
        }
    }
}

impl MapElement for TestElement {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn location(&self) -> GeoPoint {
        self.at
    }
}

pub fn elements(points: &[(f64, f64)]) -> Vec<Arc<TestElement>> {
    points
        .iter()
        .map(|(lat, lng)| Arc::new(TestElement::at(*lat, *lng)))
        .collect()
}

/// The five reference elements: three close together, two further apart
pub fn reference_elements() -> Vec<Arc<TestElement>> {
    elements(&[
        (40.0, 20.0),
        (42.0, 21.0),
        (44.0, 21.0),
        (20.0, 2.0),
        (15.0, 4.0),
    ])
}

/// Which positions count as on screen
#[derive(Debug, Clone)]
pub enum Region {
    Everything,
    Points(Vec<GeoPoint>),
}

impl Region {
    fn contains(&self, point: GeoPoint) -> bool {
        match self {
            Region::Everything => true,
            Region::Points(points) => points.contains(&point),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DummyViewport {
    pub factor: f64,
    pub region: Region,
    /// Make the projection panic during the compute phase
    pub explode: bool,
}

impl DummyViewport {
    pub fn everything(factor: f64) -> Self {
        Self {
            factor,
            region: Region::Everything,
            explode: false,
        }
    }

    pub fn showing(points: &[GeoPoint]) -> Self {
        Self {
            factor: 1.0,
            region: Region::Points(points.to_vec()),
            explode: false,
        }
    }

    pub fn exploding() -> Self {
        Self {
            explode: true,
            ..Self::everything(1.0)
        }
    }
}

/// Gate blocking the compute phase until the test opens it
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    fn pass(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }
}

#[derive(Debug, Default)]
pub struct DummyAdapter {
    next_marker: AtomicU64,
    pub markers: Mutex<HashMap<u64, ClusterView>>,
    pub created: AtomicUsize,
    pub updated: AtomicUsize,
    pub deleted: AtomicUsize,
    pub fail_materialize: AtomicBool,
    gate: Option<Arc<Gate>>,
}

impl DummyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter whose compute phase waits for `gate`
    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.lock().unwrap().len()
    }

    pub fn view(&self, marker: u64) -> Option<ClusterView> {
        self.markers.lock().unwrap().get(&marker).cloned()
    }
}

impl MapAdapter for DummyAdapter {
    type Viewport = DummyViewport;
    type Bounds = DummyViewport;
    type Marker = u64;

    fn visible_region(&self, viewport: &DummyViewport) -> DummyViewport {
        viewport.clone()
    }

    fn bounds_contains(&self, bounds: &DummyViewport, point: GeoPoint) -> bool {
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        if bounds.explode {
            panic!("projection exploded");
        }
        bounds.region.contains(point)
    }

    fn pixel_distance(&self, a: GeoPoint, b: GeoPoint, viewport: &DummyViewport) -> f64 {
        a.degree_distance(&b) * viewport.factor
    }

    fn materialize_marker(&self, view: &ClusterView) -> Result<u64> {
        if self.fail_materialize.load(Ordering::SeqCst) {
            return Err(ClusterError::marker("renderer unavailable"));
        }
        let id = self.next_marker.fetch_add(1, Ordering::SeqCst);
        self.markers.lock().unwrap().insert(id, view.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn update_marker(&self, marker: &u64, view: &ClusterView) -> Result<()> {
        self.markers.lock().unwrap().insert(*marker, view.clone());
        self.updated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_marker(&self, marker: u64) {
        self.markers.lock().unwrap().remove(&marker);
        self.deleted.fetch_add(1, Ordering::SeqCst);
    }
}
