//! Span Helpers for Driver Tracing
//!
//! Every log line emitted while a fault is in flight carries the run seed,
//! the iteration number and the fault name through these spans.

use tracing::{span, Level, Span};

/// Span covering a whole driver run
#[inline]
pub fn driver_span(seed: u64) -> Span {
    span!(Level::INFO, "alert_sim.driver", driver.seed = seed)
}

/// Span covering one select-to-teardown iteration
#[inline]
pub fn iteration_span(iteration: u64, fault: &str) -> Span {
    span!(
        Level::INFO,
        "alert_sim.iteration",
        iteration = iteration,
        fault = %fault
    )
}

/// Span covering a single injection call
#[inline]
pub fn injection_span(fault: &str, host: &str) -> Span {
    span!(
        Level::DEBUG,
        "alert_sim.inject",
        fault = %fault,
        target.host = %host
    )
}
