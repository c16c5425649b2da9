use serde::Serialize;
use stampede_metrics::MetricsSnapshot;
use std::time::Duration;

use crate::thresholds_eval::ThresholdOutcome;

/// Everything a run produced, derived from one final metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub metrics: MetricsSnapshot,
    pub thresholds: Vec<ThresholdOutcome>,
    pub passed: bool,
    pub requests_total: u64,
    pub iterations_total: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_ms")]
    pub elapsed: Duration,
    pub peak_vus: u64,
    /// The run was stopped before its schedule finished.
    pub aborted: bool,
}

impl RunResult {
    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| !t.passed)
    }
}

fn serialize_ms<S>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(d.as_secs_f64() * 1000.0)
}
