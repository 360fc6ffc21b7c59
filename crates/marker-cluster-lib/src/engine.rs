//! MarkerEngine - public API tying clustering, scheduling and rendering together
//!
//! A request resolves the visible region on the calling thread, then the compute phase
//! runs on the engine's own worker thread and the apply phase (marker CRUD, pruning,
//! listener notification) runs through the [`Dispatcher`]. At most one pass is in
//! flight; requests arriving meanwhile replace each other in a single pending slot.

use crate::listeners::Listeners;
use crate::scheduler::Scheduler;
use crate::{
    ClusterError, ClusterSet, ClusterSnapshot, ClusterView, Dispatcher, DisplayMetrics,
    ElementKey, EngineConfig, GeoPoint, ListenerHandle, MapAdapter, MapElement, MarkerColor,
    PassStats, Phase, Result, SortedCursor, Spacing,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Sent to map-changed listeners after every applied pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateSummary {
    /// Sequence number of the pass, starting at 1
    pub pass: u64,
    pub zoom: f64,
    pub stats: PassStats,
    /// Elements currently represented by a marker
    pub visible_count: usize,
    /// Markers on the map after pruning
    pub cluster_count: usize,
}

struct UpdateRequest<A: MapAdapter> {
    viewport: A::Viewport,
    bounds: A::Bounds,
    zoom: f64,
}

struct ClusterState<M> {
    set: ClusterSet<M>,
    /// Marker handle → cluster index, rebuilt after every apply
    by_marker: HashMap<M, usize>,
    selected: Option<M>,
}

struct Shared<E, A: MapAdapter> {
    elements: Vec<Arc<E>>,
    locations: Vec<GeoPoint>,
    adapter: A,
    dispatcher: Box<dyn Dispatcher>,
    config: EngineConfig,
    metrics: DisplayMetrics,
    /// Pixel threshold as `f64` bits
    threshold: AtomicU64,
    passes: AtomicU64,
    /// Set once the engine is dropped; a late apply must not draw anything
    closed: AtomicBool,
    state: Mutex<ClusterState<A::Marker>>,
    scheduler: Mutex<Scheduler<UpdateRequest<A>>>,
    phase: watch::Sender<Phase>,
    jobs: mpsc::UnboundedSender<UpdateRequest<A>>,
    map_listeners: Mutex<Listeners<UpdateSummary>>,
    click_listeners: Mutex<Listeners<ClusterSnapshot<A::Marker>>>,
    cursor: Mutex<SortedCursor>,
    pinned: Mutex<HashMap<String, A::Marker>>,
}

/// Recover the data of a poisoned mutex; a failed pass must not take the engine down
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clustering engine for one map
pub struct MarkerEngine<E: MapElement, A: MapAdapter> {
    shared: Arc<Shared<E, A>>,
}

impl<E: MapElement, A: MapAdapter> MarkerEngine<E, A> {
    /// Create an engine for a fixed list of elements
    ///
    /// Validates the configuration, converts the marker spacing to pixels and starts the
    /// background worker. Every element starts outside the viewport; nothing is drawn
    /// until the first [`request_update`](Self::request_update).
    pub fn register<I, D>(
        elements: I,
        metrics: DisplayMetrics,
        adapter: A,
        dispatcher: D,
        config: EngineConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<E>>,
        D: Dispatcher,
    {
        let threshold = config.pixel_threshold(&metrics)?;
        let elements: Vec<Arc<E>> = elements.into_iter().collect();
        let locations: Vec<GeoPoint> = elements.iter().map(|e| e.location()).collect();
        let (jobs, receiver) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(Phase::Idle);

        tracing::info!(
            "Registering {} elements, marker spacing {threshold}px",
            elements.len()
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(ClusterState {
                set: ClusterSet::new(elements.len(), config.default_color),
                by_marker: HashMap::new(),
                selected: None,
            }),
            cursor: Mutex::new(SortedCursor::new(&locations)),
            elements,
            locations,
            adapter,
            dispatcher: Box::new(dispatcher),
            config,
            metrics,
            threshold: AtomicU64::new(threshold.to_bits()),
            passes: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            scheduler: Mutex::new(Scheduler::new()),
            phase,
            jobs,
            map_listeners: Mutex::new(Listeners::new()),
            click_listeners: Mutex::new(Listeners::new()),
            pinned: Mutex::new(HashMap::new()),
        });

        spawn_worker(Arc::downgrade(&shared), receiver)?;
        Ok(Self { shared })
    }

    /// Recluster for a new camera position
    ///
    /// Returns immediately. If a pass is already running the request is parked, replacing
    /// any request parked before it.
    pub fn request_update(&self, viewport: A::Viewport, zoom: f64) -> Result<()> {
        let bounds = self.shared.adapter.visible_region(&viewport);
        let request = UpdateRequest {
            viewport,
            bounds,
            zoom,
        };
        let start = {
            let mut scheduler = lock(&self.shared.scheduler);
            let start = scheduler.request(request);
            self.shared.phase.send_replace(scheduler.phase());
            start
        };
        match start {
            Some(request) => self.shared.start(request),
            None => {
                tracing::debug!("Update in progress, request queued");
                Ok(())
            }
        }
    }

    pub fn phase(&self) -> Phase {
        *self.shared.phase.borrow()
    }

    /// Wait until no pass is running or queued
    pub async fn wait_idle(&self) {
        let mut phase = self.shared.phase.subscribe();
        // The sender lives as long as `self`, so this only returns once idle
        let _ = phase.wait_for(|phase| *phase == Phase::Idle).await;
    }

    /// Register a listener called after every applied pass
    pub fn on_map_changed<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&UpdateSummary) + Send + Sync + 'static,
    {
        lock(&self.shared.map_listeners).add(Arc::new(listener))
    }

    pub fn remove_map_changed_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.shared.map_listeners).remove(handle)
    }

    /// Register a listener called when a cluster marker is clicked
    pub fn on_marker_click<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&ClusterSnapshot<A::Marker>) + Send + Sync + 'static,
    {
        lock(&self.shared.click_listeners).add(Arc::new(listener))
    }

    pub fn remove_marker_click_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.shared.click_listeners).remove(handle)
    }

    /// Entry point for the provider's click events
    ///
    /// Selects the clicked cluster (active color) and resets the previously selected one;
    /// clicking the selected cluster again deselects it. Unknown markers are ignored.
    pub fn handle_click(&self, marker: &A::Marker) -> Option<ClusterSnapshot<A::Marker>> {
        let snapshot = {
            let mut state = lock(&self.shared.state);
            let index = *state.by_marker.get(marker)?;
            // Emptied by a compute that has not been applied yet
            if !state.set.get(index)?.is_alive() {
                return None;
            }
            let previous = state.selected.take();

            if let Some(previous) = previous.as_ref().filter(|previous| *previous != marker) {
                if let Some(previous_index) = state.by_marker.get(previous).copied() {
                    self.shared.restyle(
                        &mut state.set,
                        previous_index,
                        self.shared.config.default_color,
                    );
                }
            }

            let color = if previous.as_ref() == Some(marker) {
                self.shared.config.default_color
            } else {
                state.selected = Some(marker.clone());
                self.shared.config.active_color
            };
            self.shared.restyle(&mut state.set, index, color);
            state.set.get(index)?.snapshot()
        };

        let callbacks = lock(&self.shared.click_listeners).snapshot();
        for callback in callbacks {
            callback(&snapshot);
        }
        Some(snapshot)
    }

    /// Draw a single element as its own marker, outside the viewport-driven clusters
    ///
    /// Adding an id that is already pinned replaces the old marker.
    pub fn add_element_with_id<P: MapElement>(
        &self,
        element: &P,
        color: MarkerColor,
    ) -> Result<A::Marker> {
        let id = element.id().ok_or(ClusterError::MissingId)?.to_string();
        let mut pinned = lock(&self.shared.pinned);
        if let Some(previous) = pinned.remove(&id) {
            tracing::debug!("Replacing pinned marker {id}");
            self.shared.adapter.delete_marker(previous);
        }
        let marker = self
            .shared
            .adapter
            .materialize_marker(&ClusterView::of_element(element, color))?;
        pinned.insert(id, marker.clone());
        Ok(marker)
    }

    /// Remove a marker added with [`add_element_with_id`](Self::add_element_with_id)
    pub fn remove_element_by_id(&self, id: &str) -> bool {
        let mut pinned = lock(&self.shared.pinned);
        match pinned.remove(id) {
            Some(marker) => {
                self.shared.adapter.delete_marker(marker);
                true
            }
            None => {
                tracing::debug!(
                    "Unable to delete pinned marker {id}, available: {:?}",
                    pinned.keys().collect::<Vec<_>>()
                );
                false
            }
        }
    }

    /// Step the clicked cluster's own cursor (wrapping) and return the element under it
    pub fn advance_marker_cursor(&self, marker: &A::Marker) -> Option<Arc<E>> {
        let mut state = lock(&self.shared.state);
        let index = *state.by_marker.get(marker)?;
        let cluster = state.set.get_mut(index).filter(|cluster| cluster.is_alive())?;
        let key = cluster.advance_cursor()?;
        self.shared.render_one(&mut state.set, index);
        self.element(key)
    }

    /// Element under the cursor of the cluster drawn as `marker`
    pub fn element_for_marker(&self, marker: &A::Marker) -> Option<Arc<E>> {
        let state = lock(&self.shared.state);
        let index = *state.by_marker.get(marker)?;
        let key = state
            .set
            .get(index)
            .filter(|cluster| cluster.is_alive())?
            .current_element()?;
        self.element(key)
    }

    /// Step to the next older located element
    pub fn move_next(&self) -> bool {
        lock(&self.shared.cursor).move_next()
    }

    /// Step to the next newer located element
    pub fn move_prev(&self) -> bool {
        lock(&self.shared.cursor).move_prev()
    }

    pub fn has_next(&self) -> bool {
        lock(&self.shared.cursor).has_next()
    }

    pub fn has_prev(&self) -> bool {
        lock(&self.shared.cursor).has_prev()
    }

    /// Element under the global cursor
    pub fn current(&self) -> Option<Arc<E>> {
        let key = lock(&self.shared.cursor).current()?;
        self.element(key)
    }

    pub fn cursor_position(&self) -> usize {
        lock(&self.shared.cursor).position()
    }

    /// Jump the global cursor; out-of-range positions are rejected
    pub fn set_cursor(&self, position: usize) -> bool {
        lock(&self.shared.cursor).set(position)
    }

    /// Copies of all alive clusters, in list order
    pub fn clusters(&self) -> Vec<ClusterSnapshot<A::Marker>> {
        lock(&self.shared.state)
            .set
            .alive()
            .map(|cluster| cluster.snapshot())
            .collect()
    }

    /// Number of elements currently represented on the map
    pub fn visible_count(&self) -> usize {
        lock(&self.shared.state).set.visible_count()
    }

    pub fn min_pixel_distance(&self) -> f64 {
        self.shared.threshold()
    }

    /// Change the marker spacing. Takes effect with the next pass.
    pub fn set_min_pixel_distance(&self, spacing: Spacing) -> Result<()> {
        let pixels = spacing.to_pixels(&self.shared.metrics)?;
        self.shared
            .threshold
            .store(pixels.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn element(&self, key: ElementKey) -> Option<Arc<E>> {
        self.shared.elements.get(key.index()).cloned()
    }

    pub fn elements(&self) -> &[Arc<E>] {
        &self.shared.elements
    }

    pub fn adapter(&self) -> &A {
        &self.shared.adapter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<E: MapElement, A: MapAdapter> Shared<E, A> {
    fn threshold(&self) -> f64 {
        f64::from_bits(self.threshold.load(Ordering::Relaxed))
    }

    fn start(&self, request: UpdateRequest<A>) -> Result<()> {
        if self.jobs.send(request).is_err() {
            let mut scheduler = lock(&self.scheduler);
            *scheduler = Scheduler::new();
            self.phase.send_replace(Phase::Idle);
            tracing::error!("Background worker is gone, dropping update");
            return Err(ClusterError::WorkerUnavailable);
        }
        Ok(())
    }

    /// Compute on the worker, then hand the apply phase to the dispatcher
    fn run_pass(self: Arc<Self>, request: UpdateRequest<A>) {
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.compute(&request)));
        let stats = match outcome {
            Ok(stats) => {
                tracing::debug!(
                    "Computed clusters for zoom {} in {:?}",
                    request.zoom,
                    started.elapsed()
                );
                Some(stats)
            }
            Err(_) => {
                tracing::error!(
                    "Cluster computation for zoom {} failed, skipping apply",
                    request.zoom
                );
                None
            }
        };

        {
            let mut scheduler = lock(&self.scheduler);
            scheduler.computed();
            self.phase.send_replace(scheduler.phase());
        }

        let zoom = request.zoom;
        let shared = self.clone();
        self.dispatcher
            .dispatch(Box::new(move || shared.apply(zoom, stats)));
    }

    fn compute(&self, request: &UpdateRequest<A>) -> PassStats {
        let threshold = self.threshold();
        let bounds = &request.bounds;
        let viewport = &request.viewport;
        let adapter = &self.adapter;
        let mut state = lock(&self.state);
        state.set.compute_pass(
            &self.locations,
            |point| adapter.bounds_contains(bounds, point),
            |a, b| adapter.pixel_distance(a, b, viewport),
            threshold,
            request.zoom,
        )
    }

    /// Runs on the dispatcher's thread
    fn apply(self: Arc<Self>, zoom: f64, stats: Option<PassStats>) {
        if let Some(stats) = stats {
            let started = Instant::now();
            let summary = {
                let mut state = lock(&self.state);
                if self.closed.load(Ordering::Acquire) {
                    None
                } else {
                    self.render(&mut state);
                    Some(UpdateSummary {
                        pass: self.passes.fetch_add(1, Ordering::Relaxed) + 1,
                        zoom,
                        stats,
                        visible_count: state.set.visible_count(),
                        cluster_count: state.set.alive_count(),
                    })
                }
            };
            match summary {
                Some(summary) => self.notify(&summary, started),
                None => tracing::debug!("Engine dropped, discarding pass for zoom {zoom}"),
            }
        }

        let next = {
            let mut scheduler = lock(&self.scheduler);
            let mut next = scheduler.applied();
            if next.is_some() && self.closed.load(Ordering::Acquire) {
                // Nobody is left to see a queued pass
                *scheduler = Scheduler::new();
                next = None;
            }
            self.phase.send_replace(scheduler.phase());
            next
        };
        if let Some(request) = next {
            tracing::debug!("Starting queued update for zoom {}", request.zoom);
            if let Err(err) = self.start(request) {
                tracing::error!("Queued update lost: {err}");
            }
        }
    }

    fn notify(&self, summary: &UpdateSummary, started: Instant) {
        tracing::debug!(
            "Applied pass {} in {:?}: {} clusters, {} visible elements",
            summary.pass,
            started.elapsed(),
            summary.cluster_count,
            summary.visible_count
        );

        let callbacks = lock(&self.map_listeners).snapshot();
        for callback in callbacks {
            callback(summary);
        }
    }

    /// Push the clustering result to the map: delete emptied, draw touched
    fn render(&self, state: &mut ClusterState<A::Marker>) {
        for marker in state.set.prune() {
            if state.selected.as_ref() == Some(&marker) {
                state.selected = None;
            }
            self.adapter.delete_marker(marker);
        }

        for index in 0..state.set.clusters().len() {
            if state.set.clusters()[index].is_touched() {
                self.render_one(&mut state.set, index);
            }
        }

        state.by_marker = state
            .set
            .clusters()
            .iter()
            .enumerate()
            .filter_map(|(index, cluster)| cluster.marker().map(|m| (m.clone(), index)))
            .collect();
    }

    /// Draw or redraw one cluster. Failures leave it touched for the next apply.
    fn render_one(&self, set: &mut ClusterSet<A::Marker>, index: usize) {
        let Some(cluster) = set.get_mut(index) else {
            return;
        };
        let view = ClusterView::of_cluster(cluster, &self.elements);
        let result = match cluster.marker() {
            Some(marker) => self.adapter.update_marker(marker, &view),
            None => self
                .adapter
                .materialize_marker(&view)
                .map(|marker| cluster.set_marker(marker)),
        };
        match result {
            Ok(()) => cluster.mark_rendered(),
            Err(err) => tracing::warn!("Failed to draw cluster marker, will retry: {err}"),
        }
    }

    fn restyle(&self, set: &mut ClusterSet<A::Marker>, index: usize, color: MarkerColor) {
        if let Some(cluster) = set.get_mut(index) {
            cluster.set_color(color);
            if cluster.is_touched() {
                self.render_one(set, index);
            }
        }
    }
}

/// Start the compute thread. It exits once the engine is dropped.
fn spawn_worker<E: MapElement, A: MapAdapter>(
    shared: Weak<Shared<E, A>>,
    mut jobs: mpsc::UnboundedReceiver<UpdateRequest<A>>,
) -> Result<()> {
    std::thread::Builder::new()
        .name("marker-cluster-worker".to_string())
        .spawn(move || {
            while let Some(request) = jobs.blocking_recv() {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let outcome = catch_unwind(AssertUnwindSafe(|| shared.clone().run_pass(request)));
                if outcome.is_err() {
                    // Only reachable when the apply phase runs inline and panicked
                    tracing::error!("Applying clusters failed");
                    let next = {
                        let mut scheduler = lock(&shared.scheduler);
                        let next = if scheduler.phase() == Phase::Applying {
                            scheduler.applied()
                        } else {
                            None
                        };
                        shared.phase.send_replace(scheduler.phase());
                        next
                    };
                    if let Some(request) = next {
                        if let Err(err) = shared.start(request) {
                            tracing::error!("Queued update lost: {err}");
                        }
                    }
                }
            }
            tracing::debug!("Marker cluster worker stopped");
        })?;
    Ok(())
}

impl<E: MapElement, A: MapAdapter> Drop for MarkerEngine<E, A> {
    fn drop(&mut self) {
        let markers: Vec<A::Marker> = {
            let mut state = lock(&self.shared.state);
            self.shared.closed.store(true, Ordering::Release);
            state.by_marker.clear();
            state
                .set
                .clusters_mut()
                .iter_mut()
                .filter_map(|cluster| cluster.take_marker())
                .collect()
        };
        let pinned: Vec<A::Marker> = lock(&self.shared.pinned).drain().map(|(_, m)| m).collect();
        tracing::debug!(
            "Dropping engine, removing {} markers",
            markers.len() + pinned.len()
        );
        for marker in markers.into_iter().chain(pinned) {
            self.shared.adapter.delete_marker(marker);
        }
    }
}
