//! Engine configuration and display metrics

use crate::{ClusterError, MarkerColor, Result, utils};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default minimum spacing between markers, in millimeters on screen
pub const DEFAULT_SPACING_MM: f64 = 2.0;

/// Minimum on-screen distance below which elements share a marker
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Spacing {
    /// Physical distance, converted with the display's horizontal dpi
    Millimeters(f64),
    /// Device pixels, used verbatim
    Pixels(f64),
}

impl Spacing {
    /// Resolve the spacing to whole pixels for the given display
    pub fn to_pixels(self, metrics: &DisplayMetrics) -> Result<f64> {
        let pixels = match self {
            Spacing::Millimeters(mm) => {
                if !mm.is_finite() || mm < 0.0 {
                    return Err(ClusterError::InvalidConfig(format!(
                        "marker spacing must be a non-negative distance, got {mm}mm"
                    )));
                }
                utils::millimeters_to_pixels(mm, metrics.xdpi)
            }
            Spacing::Pixels(px) => {
                if !px.is_finite() || px < 0.0 {
                    return Err(ClusterError::InvalidConfig(format!(
                        "marker spacing must be a non-negative distance, got {px}px"
                    )));
                }
                px
            }
        };
        Ok(pixels)
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Millimeters(DEFAULT_SPACING_MM)
    }
}

/// Physical properties of the screen the map is drawn on
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayMetrics {
    /// Horizontal pixels per inch
    pub xdpi: f64,
    /// Logical density (1.0 = 160 dpi baseline)
    pub density: f64,
}

impl DisplayMetrics {
    pub fn new(xdpi: f64, density: f64) -> Self {
        Self { xdpi, density }
    }

    fn validate(&self) -> Result<()> {
        if !self.xdpi.is_finite() || self.xdpi <= 0.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "display xdpi must be positive, got {}",
                self.xdpi
            )));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "display density must be positive, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            xdpi: 160.0,
            density: 1.0,
        }
    }
}

/// Configuration for a [`MarkerEngine`](crate::MarkerEngine)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Minimum spacing between markers. Default: 2mm
    pub spacing: Spacing,
    /// Color of unselected markers. Default: blue
    pub default_color: MarkerColor,
    /// Color of the clicked marker. Default: red
    pub active_color: MarkerColor,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spacing: Spacing::default(),
            default_color: MarkerColor::Blue,
            active_color: MarkerColor::Red,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration against a display and derive the pixel threshold
    pub fn pixel_threshold(&self, metrics: &DisplayMetrics) -> Result<f64> {
        metrics.validate()?;
        self.spacing.to_pixels(metrics)
    }
}
