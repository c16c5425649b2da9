use serde::Serialize;
use std::collections::BTreeMap;

use crate::metrics::{MetricKind, MetricValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Immutable view of every metric, taken at a single instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    metrics: BTreeMap<String, MetricValue>,
    checks: Vec<CheckSummary>,
}

impl MetricsSnapshot {
    pub(crate) fn new(metrics: BTreeMap<String, MetricValue>, mut checks: Vec<CheckSummary>) -> Self {
        checks.sort_by(|a, b| a.name.cmp(&b.name));
        Self { metrics, checks }
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.get(name).map(MetricValue::kind)
    }

    /// Metrics in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn checks(&self) -> &[CheckSummary] {
        &self.checks
    }

    pub fn checks_failed_total(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    /// Counter sum, or 0 when the metric is absent or not a counter.
    pub fn counter_or_zero(&self, name: &str) -> f64 {
        self.get(name)
            .and_then(MetricValue::as_counter)
            .map_or(0.0, |c| c.count)
    }
}
