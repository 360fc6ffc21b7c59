//! Performance benchmarks for marker-cluster-lib
//!
//! Run with: cargo bench --package marker-cluster-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use marker_cluster_lib::{
    BoundingBox, ClusterSet, GeoPoint, MarkerColor, MercatorProjection, utils,
};

/// Scatter points on a spiral around a center, dense in the middle and sparse outside
fn generate_points(num_points: usize, center_lat: f64, center_lng: f64) -> Vec<GeoPoint> {
    (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let angle = i as f64 * 2.399_963; // golden angle
            let radius = t.sqrt() * 2.0;
            GeoPoint::new(
                center_lat + radius * angle.sin(),
                center_lng + radius * angle.cos() + (t * 40.0).sin() * 0.01,
            )
        })
        .collect()
}

fn create_projection(north: f64, west: f64, south: f64, east: f64) -> MercatorProjection {
    MercatorProjection::new(BoundingBox::from_edges(north, west, south, east), 1080.0, 1920.0)
}

/// Run one pass the way the engine's worker does
fn run_pass(
    set: &mut ClusterSet<u64>,
    points: &[GeoPoint],
    projection: &MercatorProjection,
    threshold: f64,
    zoom: f64,
) -> usize {
    let region = projection.visible_region();
    set.compute_pass(
        points,
        |point| region.contains(point),
        |a, b| projection.pixel_distance(a, b),
        threshold,
        zoom,
    );
    set.alive_count()
}

fn bench_initial_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_pass");
    group.sample_size(20);

    let threshold = utils::millimeters_to_pixels(2.0, 160.0);
    let projection = create_projection(44.0, -6.0, 36.0, 4.0);

    for size in [1_000usize, 10_000, 50_000] {
        let points = generate_points(size, 40.0, -1.0);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &points, |b, points| {
            b.iter(|| {
                let mut set = ClusterSet::new(points.len(), MarkerColor::Blue);
                run_pass(&mut set, points, &projection, threshold, 6.0)
            });
        });
    }

    group.finish();
}

fn bench_zoom_transitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("zoom_transitions");
    group.sample_size(20);

    let threshold = utils::millimeters_to_pixels(2.0, 160.0);
    let wide = create_projection(44.0, -6.0, 36.0, 4.0);
    let close = wide.zoomed_by(2.0);
    let points = generate_points(10_000, 40.0, -1.0);
    group.throughput(Throughput::Elements(points.len() as u64));

    // Zoom in: split the clusters of the wide view
    group.bench_function("split_10k", |b| {
        let mut base = ClusterSet::new(points.len(), MarkerColor::Blue);
        run_pass(&mut base, &points, &wide, threshold, 6.0);
        b.iter_batched(
            || base.clone(),
            |mut set| run_pass(&mut set, &points, &close, threshold, 8.0),
            criterion::BatchSize::LargeInput,
        );
    });

    // Zoom out: merge the clusters of the close view
    group.bench_function("merge_10k", |b| {
        let mut base = ClusterSet::new(points.len(), MarkerColor::Blue);
        run_pass(&mut base, &points, &close, threshold, 8.0);
        b.iter_batched(
            || base.clone(),
            |mut set| run_pass(&mut set, &points, &wide, threshold, 6.0),
            criterion::BatchSize::LargeInput,
        );
    });

    // Same viewport again: only the visibility scan
    group.bench_function("unchanged_10k", |b| {
        let mut set = ClusterSet::new(points.len(), MarkerColor::Blue);
        run_pass(&mut set, &points, &wide, threshold, 6.0);
        b.iter(|| run_pass(&mut set, &points, &wide, threshold, 6.0));
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    let projection = create_projection(44.0, 170.0, 36.0, -170.0);
    let a = GeoPoint::new(40.0, 175.0);
    let b = GeoPoint::new(41.0, -175.0);

    group.bench_function("pixel_distance_antimeridian", |bench| {
        bench.iter(|| projection.pixel_distance(a, b));
    });

    let points = generate_points(1_000, 40.0, -1.0);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("spherical_centroid_1k", |bench| {
        bench.iter(|| utils::spherical_centroid(points.iter().copied()));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_initial_pass,
    bench_zoom_transitions,
    bench_projection,
);

criterion_main!(benches);
