pub mod metrics;

pub use metrics::{PassStatus, SyncMetrics, SyncMetricsSnapshot};
