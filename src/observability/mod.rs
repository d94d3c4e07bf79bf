//! Observability
//!
//! - Structured logging via `tracing`, installed by [`init_tracing`]
//! - Spans tagging each driver iteration with its fault
//! - A metrics recorder trait with no-op and in-memory implementations
//!
//! # Usage
//!
//! ```rust,ignore
//! use alert_sim::config::LogConfig;
//! use alert_sim::observability::{init_tracing, simulated_metrics};
//!
//! init_tracing(&LogConfig::default()).expect("Failed to initialize tracing");
//! let metrics = simulated_metrics();
//! metrics.record_step("inject", "PSU_FAULT", true);
//! ```

pub mod recorder;
pub mod spans;
pub mod tracing_setup;

pub use recorder::{
    noop_metrics, simulated_metrics, MetricType, MetricsRecorder, NoopMetrics, RecordedMetric,
    SharedMetrics, SimulatedMetrics,
};
pub use spans::*;
pub use tracing_setup::init as init_tracing;
