//! Telemetry and metrics infrastructure for banter

pub mod session_metrics;

pub use session_metrics::SessionMetrics;
