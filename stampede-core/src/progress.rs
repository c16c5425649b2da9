use std::time::Duration;

use crate::schedule::StageSnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveMetrics {
    pub iterations_total: u64,
    /// Iterations/sec observed during the last control interval.
    pub iterations_per_sec_now: f64,
    pub requests_total: u64,
    /// Requests/sec observed during the last control interval.
    pub rps_now: f64,
    pub failed_requests_total: u64,
    pub checks_failed_total: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    pub total_duration: Duration,
    pub stage: Option<StageSnapshot>,
    pub desired_vus: u64,
    pub live_vus: u64,
    pub metrics: LiveMetrics,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
