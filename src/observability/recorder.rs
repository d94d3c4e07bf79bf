//! Metrics Recorder
//!
//! Trait abstraction for driver metrics so runs against real clusters can
//! export counters while tests record them in memory and assert on them.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for recording driver metrics
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Increment a counter by 1
    fn incr(&self, name: &str, tags: &[&str]);

    /// Record a timing in milliseconds
    fn timing(&self, name: &str, duration_ms: f64, tags: &[&str]);

    /// Record the outcome of one driver step (setup, inject, resolve, teardown)
    fn record_step(&self, step: &str, fault: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let step_tag = format!("step:{}", step);
        let fault_tag = format!("fault:{}", fault.to_lowercase());
        let status_tag = format!("status:{}", status);

        self.incr("driver.step", &[&step_tag, &fault_tag, &status_tag]);
    }

    /// Record a selection thrown away by the filter
    fn record_skip(&self, reason: &str) {
        let reason_tag = format!("reason:{}", reason);
        self.incr("driver.skip", &[&reason_tag]);
    }
}

/// No-op metrics recorder
#[derive(Clone, Default)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    #[inline]
    fn incr(&self, _name: &str, _tags: &[&str]) {}
    #[inline]
    fn timing(&self, _name: &str, _duration_ms: f64, _tags: &[&str]) {}
}

/// Recorded metric for testing
#[derive(Debug, Clone)]
pub struct RecordedMetric {
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
    pub metric_type: MetricType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Timing,
}

/// In-memory recorder that keeps every metric for verification
#[derive(Default)]
pub struct SimulatedMetrics {
    recorded: Mutex<Vec<RecordedMetric>>,
    step_count: AtomicU64,
    skip_count: AtomicU64,
}

impl SimulatedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded metrics
    pub fn get_recorded(&self) -> Vec<RecordedMetric> {
        self.recorded.lock().clone()
    }

    /// Get metrics by name
    pub fn get_by_name(&self, name: &str) -> Vec<RecordedMetric> {
        self.recorded
            .lock()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Metrics by name carrying `tag`
    pub fn count_tagged(&self, name: &str, tag: &str) -> usize {
        self.recorded
            .lock()
            .iter()
            .filter(|m| m.name == name && m.tags.iter().any(|t| t == tag))
            .count()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count.load(Ordering::SeqCst)
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.recorded.lock().clear();
        self.step_count.store(0, Ordering::SeqCst);
        self.skip_count.store(0, Ordering::SeqCst);
    }
}

impl MetricsRecorder for SimulatedMetrics {
    fn incr(&self, name: &str, tags: &[&str]) {
        self.recorded.lock().push(RecordedMetric {
            name: name.to_string(),
            value: 1.0,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            metric_type: MetricType::Counter,
        });
    }

    fn timing(&self, name: &str, duration_ms: f64, tags: &[&str]) {
        self.recorded.lock().push(RecordedMetric {
            name: name.to_string(),
            value: duration_ms,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            metric_type: MetricType::Timing,
        });
    }

    fn record_step(&self, step: &str, fault: &str, success: bool) {
        self.step_count.fetch_add(1, Ordering::SeqCst);

        let status = if success { "success" } else { "error" };
        let step_tag = format!("step:{}", step);
        let fault_tag = format!("fault:{}", fault.to_lowercase());
        let status_tag = format!("status:{}", status);

        self.incr("driver.step", &[&step_tag, &fault_tag, &status_tag]);
    }

    fn record_skip(&self, reason: &str) {
        self.skip_count.fetch_add(1, Ordering::SeqCst);
        let reason_tag = format!("reason:{}", reason);
        self.incr("driver.skip", &[&reason_tag]);
    }
}

/// Arc wrapper for trait object usage
pub type SharedMetrics = Arc<dyn MetricsRecorder>;

/// Create a no-op metrics recorder
pub fn noop_metrics() -> SharedMetrics {
    Arc::new(NoopMetrics)
}

/// Create a simulated metrics recorder for testing
pub fn simulated_metrics() -> Arc<SimulatedMetrics> {
    Arc::new(SimulatedMetrics::new())
}
