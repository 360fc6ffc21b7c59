use clap::Parser;
use marker_cluster_lib::{BoundingBox, DEFAULT_SPACING_MM};
use std::path::PathBuf;

/// Density of the reference display when neither `--xdpi` nor `MARKER_CLUSTER_XDPI` is set
pub const DEFAULT_XDPI: f64 = 160.0;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Marker Cluster - cluster geo-tagged elements the way a map view would, without a map
pub struct Settings {
    /// GPX files whose waypoints and track points become elements
    #[clap(short, long, value_name = "FILE")]
    pub gpx: Vec<PathBuf>,

    /// Number of synthetic elements to generate when no GPX file is given
    #[clap(long, default_value = "200")]
    pub synthetic: usize,

    /// North edge of the initial viewport (default: bounds of all elements, padded)
    #[clap(long, allow_negative_numbers = true)]
    pub north: Option<f64>,

    /// West edge of the initial viewport
    #[clap(long, allow_negative_numbers = true)]
    pub west: Option<f64>,

    /// South edge of the initial viewport
    #[clap(long, allow_negative_numbers = true)]
    pub south: Option<f64>,

    /// East edge of the initial viewport
    #[clap(long, allow_negative_numbers = true)]
    pub east: Option<f64>,

    /// Canvas width in pixels
    #[clap(long, default_value = "1080")]
    pub width: f64,

    /// Canvas height in pixels
    #[clap(long, default_value = "1920")]
    pub height: f64,

    /// Horizontal display density in dots per inch [env: MARKER_CLUSTER_XDPI]
    #[clap(long)]
    pub xdpi: Option<f64>,

    /// Minimum distance between markers in millimeters [env: MARKER_CLUSTER_SPACING_MM]
    #[clap(long, allow_negative_numbers = true)]
    pub spacing_mm: Option<f64>,

    /// Zoom levels to visit; each step rescales the viewport by 2^(zoom - first zoom)
    #[clap(short, long, num_args = 1.., allow_negative_numbers = true, default_values_t = vec![0.0, 2.0, 4.0, 2.0, 0.0])]
    pub zoom: Vec<f64>,

    /// Print the report as JSON instead of text
    #[clap(long, default_value = "false")]
    pub json: bool,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn xdpi(&self) -> f64 {
        self.xdpi
            .or_else(|| get_env("MARKER_CLUSTER_XDPI"))
            .unwrap_or(DEFAULT_XDPI)
    }

    pub fn spacing_mm(&self) -> f64 {
        self.spacing_mm
            .or_else(|| get_env("MARKER_CLUSTER_SPACING_MM"))
            .unwrap_or(DEFAULT_SPACING_MM)
    }

    /// The viewport given on the command line, if all four edges were set
    pub fn viewport(&self) -> Option<BoundingBox> {
        Some(BoundingBox::from_edges(
            self.north?,
            self.west?,
            self.south?,
            self.east?,
        ))
    }
}

/// Generic function to get environment variable, parsing it to the desired type.
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
