//! Counters for the cache engines (feature `metrics`).

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use metrics_impl::{ArcMetrics, LruMetrics};
pub use snapshot::{ArcMetricsSnapshot, LruMetricsSnapshot};
pub use traits::{ArcMetricsRecorder, CoreMetricsRecorder, LruMetricsRecorder, MetricsSnapshotProvider};
