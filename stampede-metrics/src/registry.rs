use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::metrics::{CounterValue, MetricKind, MetricStorage, MetricValue, RateValue, Sample};
use crate::snapshot::{CheckSummary, MetricsSnapshot};
use crate::trend::TrendValue;

#[derive(Debug, Default)]
struct CheckTally {
    passes: AtomicU64,
    fails: AtomicU64,
}

/// Run-scoped metric store shared by every virtual user.
///
/// Metrics are created lazily on first write and never removed. Writers only
/// take the snapshot gate in shared mode, so [`Registry::snapshot`] observes
/// every metric at the same instant.
#[derive(Debug, Default)]
pub struct Registry {
    series: DashMap<Arc<str>, MetricStorage>,
    checks: DashMap<Arc<str>, CheckTally>,
    gate: RwLock<()>,
}

impl Registry {
    pub fn record(&self, name: &str, sample: Sample) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let _gate = self.gate.read();

        if let Some(storage) = self.series.get(name) {
            return storage.record(name, sample);
        }

        let storage = self
            .series
            .entry(Arc::from(name))
            .or_insert_with(|| MetricStorage::new(sample.kind()))
            .downgrade();
        storage.record(name, sample)
    }

    pub fn add_counter(&self, name: &str, value: f64) -> Result<()> {
        self.record(name, Sample::Counter(value))
    }

    pub fn add_rate(&self, name: &str, hit: bool) -> Result<()> {
        self.record(name, Sample::Rate(hit))
    }

    pub fn add_trend(&self, name: &str, value: f64) -> Result<()> {
        self.record(name, Sample::Trend(value))
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let _gate = self.gate.read();

        let bump = |tally: &CheckTally| {
            let slot = if passed { &tally.passes } else { &tally.fails };
            slot.fetch_add(1, Ordering::Relaxed);
        };

        if let Some(tally) = self.checks.get(name) {
            bump(&tally);
            return;
        }
        bump(&self.checks.entry(Arc::from(name)).or_default().downgrade());
    }

    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.series.get(name).map(|s| s.kind())
    }

    /// Current counter sum, without taking a full snapshot.
    pub fn counter(&self, name: &str) -> Option<f64> {
        match self.series.get(name)?.value() {
            MetricStorage::Counter(c) => Some(c.load()),
            _ => None,
        }
    }

    /// Current rate cells, without taking a full snapshot.
    pub fn rate(&self, name: &str) -> Option<RateValue> {
        match self.series.get(name)?.value() {
            MetricStorage::Rate(r) => Some(r.load()),
            _ => None,
        }
    }

    /// Number of observations a trend holds so far.
    pub fn trend_len(&self, name: &str) -> Option<usize> {
        match self.series.get(name)?.value() {
            MetricStorage::Trend(t) => Some(t.len()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        enum Raw {
            Counter(f64),
            Rate(RateValue),
            Trend(Vec<f64>),
        }

        let (raw, checks) = {
            let _gate = self.gate.write();

            let raw: Vec<(String, Raw)> = self
                .series
                .iter()
                .map(|entry| {
                    let v = match entry.value() {
                        MetricStorage::Counter(c) => Raw::Counter(c.load()),
                        MetricStorage::Rate(r) => Raw::Rate(r.load()),
                        MetricStorage::Trend(t) => Raw::Trend(t.copy_values()),
                    };
                    (entry.key().to_string(), v)
                })
                .collect();

            let checks: Vec<CheckSummary> = self
                .checks
                .iter()
                .map(|entry| CheckSummary {
                    name: entry.key().to_string(),
                    passes: entry.value().passes.load(Ordering::Relaxed),
                    fails: entry.value().fails.load(Ordering::Relaxed),
                })
                .collect();

            (raw, checks)
        };

        // Sorting trends happens outside the gate so writers are only paused for the copy.
        let metrics: BTreeMap<String, MetricValue> = raw
            .into_iter()
            .map(|(name, v)| {
                let value = match v {
                    Raw::Counter(count) => MetricValue::Counter(CounterValue { count }),
                    Raw::Rate(r) => MetricValue::Rate(r),
                    Raw::Trend(values) => MetricValue::Trend(TrendValue::from_values(values)),
                };
                (name, value)
            })
            .collect();

        MetricsSnapshot::new(metrics, checks)
    }
}
