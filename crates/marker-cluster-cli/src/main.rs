//! `marker-cluster`: run the clustering engine headless over GPX files or synthetic data
//!
//! Every zoom step rescales the starting viewport around its center, waits until the
//! engine is idle again and records the markers the built-in Mercator adapter holds.

mod logging;
mod report;
mod settings;
mod source;

use marker_cluster_lib::{
    BoundingBox, ClusterError, DisplayMetrics, EngineConfig, InlineDispatcher, MapElement,
    MarkerEngine, MercatorAdapter, MercatorProjection, Spacing, UpdateSummary,
};
use report::{PassReport, Report, StepReport};
use settings::Settings;
use source::Place;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No located elements to cluster")]
    NoElements,
}

/// Starting viewport: the one given on the command line, or all elements with padding
fn initial_region(settings: &Settings, elements: &[Arc<Place>]) -> Result<BoundingBox, CliError> {
    if let Some(region) = settings.viewport() {
        return Ok(region);
    }
    let located = elements
        .iter()
        .map(|element| element.location())
        .filter(|point| !point.is_unknown() && point.is_finite());
    let mut region = BoundingBox::around(located).ok_or(CliError::NoElements)?;
    region.add_padding();
    Ok(region)
}

async fn run(settings: Settings) -> Result<Report, CliError> {
    let elements = if settings.gpx.is_empty() {
        source::synthetic(settings.synthetic)
    } else {
        source::load_gpx_files(&settings.gpx)?
    };
    if elements.is_empty() {
        return Err(CliError::NoElements);
    }

    let region = initial_region(&settings, &elements)?;
    let base = MercatorProjection::new(region, settings.width, settings.height).fit_aspect();
    let config = EngineConfig {
        spacing: Spacing::Millimeters(settings.spacing_mm()),
        ..EngineConfig::default()
    };
    let engine = MarkerEngine::register(
        elements.iter().cloned(),
        DisplayMetrics::new(settings.xdpi(), 1.0),
        MercatorAdapter::new(),
        InlineDispatcher,
        config,
    )?;

    let last_summary: Arc<Mutex<Option<UpdateSummary>>> = Arc::new(Mutex::new(None));
    let sink = last_summary.clone();
    engine.on_map_changed(move |summary| {
        *sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(*summary);
    });

    let first_zoom = settings.zoom.first().copied().unwrap_or_default();
    let mut steps = Vec::with_capacity(settings.zoom.len());
    for &zoom in &settings.zoom {
        profiling::scope!("zoom step");
        let projection = base.zoomed_by(zoom - first_zoom);
        engine.request_update(projection, zoom)?;
        engine.wait_idle().await;

        let summary = last_summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        steps.push(StepReport {
            zoom,
            region: projection.visible_region(),
            pass: summary.as_ref().map(PassReport::from),
            markers: engine
                .adapter()
                .markers()
                .into_iter()
                .map(|(_, view)| view)
                .collect(),
        });
        profiling::finish_frame!();
    }

    Ok(Report {
        elements: elements.len(),
        threshold_px: engine.min_pixel_distance(),
        steps,
    })
}

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    let _logging = logging::setup_logging_and_profiling();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("Failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let json = settings.json;
    let result = runtime.block_on(run(settings)).and_then(|report| {
        if json {
            Ok(report.to_json()?)
        } else {
            Ok(report.to_text())
        }
    });

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn settings(args: &[&str]) -> Settings {
        Settings::parse_from(std::iter::once("marker-cluster").chain(args.iter().copied()))
    }

    #[tokio::test]
    async fn test_synthetic_zoom_sequence() {
        let report = run(settings(&["--synthetic", "120", "--zoom", "0", "3", "0"]))
            .await
            .unwrap();

        assert_eq!(report.elements, 120);
        assert_eq!(report.threshold_px, 12.0);
        assert_eq!(report.steps.len(), 3);

        let passes: Vec<&PassReport> = report
            .steps
            .iter()
            .map(|step| step.pass.as_ref().unwrap())
            .collect();
        assert_eq!(passes[0].zoom_change, "Initial");
        assert_eq!(passes[1].zoom_change, "In");
        assert_eq!(passes[2].zoom_change, "Out");
        // The padded starting region shows everything
        assert_eq!(passes[0].visible, 120);
        assert_eq!(passes[2].visible, 120);

        for step in &report.steps {
            let pass = step.pass.as_ref().unwrap();
            assert_eq!(step.markers.len(), pass.clusters);
            let drawn: usize = step.markers.iter().map(|m| m.element_count).sum();
            assert_eq!(drawn, pass.visible);
        }
    }

    #[tokio::test]
    async fn test_missing_gpx_file() {
        let result = run(settings(&["--gpx", "/nonexistent/marker-cluster.gpx"])).await;
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[tokio::test]
    async fn test_no_elements() {
        let result = run(settings(&["--synthetic", "0"])).await;
        assert!(matches!(result, Err(CliError::NoElements)));
    }

    #[tokio::test]
    async fn test_invalid_spacing() {
        let result = run(settings(&["--synthetic", "10", "--spacing-mm", "-2"])).await;
        assert!(matches!(
            result,
            Err(CliError::Cluster(ClusterError::InvalidConfig(_)))
        ));
    }
}
