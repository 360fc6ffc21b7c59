//! Marker Cluster Library - Viewport-driven clustering of geo-tagged map markers
//!
//! This library groups large sets of geo-tagged elements into on-screen clusters and
//! keeps those clusters up to date while the user pans and zooms a map. Rendering is
//! left to a provider-specific adapter; the library decides *what* to render.
//!
//! # Architecture
//!
//! - **[`GeoPoint`] / [`BoundingBox`]**: Antimeridian-aware geometry
//! - **[`utils::spherical_centroid`]**: Wrap-safe cluster centers
//! - **[`Cluster`] / [`ClusterSet`]**: Greedy first-fit clustering with zoom split/merge
//! - **[`visibility`]**: Which elements entered or left the viewport
//! - **[`MarkerEngine`]**: Public API; runs the compute phase on a dedicated worker and
//!   applies the results through a [`Dispatcher`] (usually the UI thread)
//! - **[`MercatorProjection`] / [`MercatorAdapter`]**: Built-in projection onto a plain
//!   pixel canvas, used by headless drivers and tests
//!
//! # Concurrency
//!
//! At most one recompute is in flight per engine. Requests arriving meanwhile overwrite a
//! single pending slot, so only the latest one runs once the current pass has been applied.

mod adapter;
mod bounds;
mod cluster;
mod clustering;
mod config;
mod cursor;
mod dispatch;
mod element;
mod engine;
mod listeners;
mod point;
mod projection;
mod scheduler;
pub mod utils;
pub mod visibility;

#[cfg(test)]
mod test_support;

// Public API exports
pub use adapter::MapAdapter;
pub use bounds::BoundingBox;
pub use cluster::{Cluster, ClusterSnapshot, ClusterView, MarkerColor};
pub use clustering::{ClusterSet, PassStats, ZoomChange};
pub use config::{DEFAULT_SPACING_MM, DisplayMetrics, EngineConfig, Spacing};
pub use cursor::SortedCursor;
pub use dispatch::{Dispatcher, InlineDispatcher, MainThreadQueue};
pub use element::{ElementKey, MapElement};
pub use engine::{MarkerEngine, UpdateSummary};
pub use listeners::ListenerHandle;
pub use point::GeoPoint;
pub use projection::{MarkerId, MercatorAdapter, MercatorProjection};
pub use scheduler::Phase;
pub use visibility::Visibility;

/// Error types for the clustering engine
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Marker operation failed: {0}")]
    Marker(String),

    #[error("Pinned elements need an id")]
    MissingId,

    #[error("Background worker is not running")]
    WorkerUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterError {
    /// Convenience constructor for adapters reporting a failed marker operation
    pub fn marker(reason: impl Into<String>) -> Self {
        Self::Marker(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
