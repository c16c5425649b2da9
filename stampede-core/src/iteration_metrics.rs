use std::time::Duration;

use stampede_metrics::Registry;

use crate::scenario::IterationOutcome;

pub const ITERATIONS: &str = "iterations";
/// Iteration duration in milliseconds.
pub const ITERATION_DURATION: &str = "iteration_duration";
pub const ITERATION_FAILED: &str = "iteration_failed";

/// Records the engine's built-in metrics for one finished iteration.
pub fn record_iteration(
    metrics: &Registry,
    outcome: &IterationOutcome,
    duration: Duration,
) -> stampede_metrics::Result<()> {
    metrics.add_counter(ITERATIONS, 1.0)?;
    metrics.add_trend(ITERATION_DURATION, duration_ms(duration))?;
    metrics.add_rate(ITERATION_FAILED, !outcome.success)
}

pub(crate) fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
