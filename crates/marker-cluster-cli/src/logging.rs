/*!
Logging and profiling setup for the command line driver.

Two implementations share one API:

- real: compiled with `feature = "profiling"`. Adds a `tracing-chrome` layer writing
  a trace file (`MARKER_CLUSTER_TRACE`, default `marker-cluster-trace.json`) that
  can be opened in Perfetto. The file is flushed when the returned guard drops.
- stub: every other build. Logging only.

Both default `RUST_LOG` when it is not set.
*/

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the profiling output alive until the end of `main`
#[must_use]
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

fn default_log_filter() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }
}

#[cfg(feature = "profiling")]
pub fn setup_logging_and_profiling() -> LoggingGuard {
    use tracing_chrome::ChromeLayerBuilder;

    default_log_filter();

    let trace_file = crate::settings::get_env::<String>("MARKER_CLUSTER_TRACE")
        .unwrap_or_else(|| "marker-cluster-trace.json".to_string());
    let (chrome_layer, guard) = ChromeLayerBuilder::new()
        .file(&trace_file)
        .include_args(true)
        .build();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry()
        .with(chrome_layer)
        .with(fmt_layer)
        .init();

    tracing::info!("Logging initialized, writing trace to {trace_file}");
    LoggingGuard { _chrome: guard }
}

#[cfg(not(feature = "profiling"))]
pub fn setup_logging_and_profiling() -> LoggingGuard {
    default_log_filter();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::debug!("Logging initialized (profiling disabled in this build)");
    LoggingGuard {}
}
