use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::trend::TrendValue;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
}

/// A single observation written into a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Contribution added to a monotonic sum.
    Counter(f64),
    /// Boolean observation; `true` counts as a hit.
    Rate(bool),
    /// Numeric observation retained for distribution queries.
    Trend(f64),
}

impl Sample {
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterValue {
    pub count: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateValue {
    pub hits: u64,
    pub total: u64,
}

impl RateValue {
    /// Fraction of `true` observations; 0 when nothing was observed.
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.hits as f64 / self.total as f64
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.total.saturating_sub(self.hits)
    }
}

impl Serialize for RateValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;

        let mut s = serializer.serialize_struct("RateValue", 3)?;
        s.serialize_field("rate", &self.rate())?;
        s.serialize_field("passes", &self.hits)?;
        s.serialize_field("fails", &self.misses())?;
        s.end()
    }
}

/// Point-in-time value of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum MetricValue {
    Counter(CounterValue),
    Rate(RateValue),
    Trend(TrendValue),
}

impl MetricValue {
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }

    pub fn as_counter(&self) -> Option<&CounterValue> {
        match self {
            Self::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_rate(&self) -> Option<&RateValue> {
        match self {
            Self::Rate(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_trend(&self) -> Option<&TrendValue> {
        match self {
            Self::Trend(t) => Some(t),
            _ => None,
        }
    }
}

/// f64 sum stored as raw bits so contributions can be added with a CAS loop.
#[derive(Debug, Default)]
pub(crate) struct CounterCell(AtomicU64);

impl CounterCell {
    pub(crate) fn add(&self, value: f64) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RateCell {
    hits: AtomicU64,
    total: AtomicU64,
}

impl RateCell {
    pub(crate) fn add(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn load(&self) -> RateValue {
        RateValue {
            hits: self.hits.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TrendCell {
    // Thresholds need exact percentiles, so every observation is kept.
    values: Mutex<Vec<f64>>,
}

impl TrendCell {
    pub(crate) fn push(&self, value: f64) {
        self.values.lock().push(value);
    }

    pub(crate) fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub(crate) fn copy_values(&self) -> Vec<f64> {
        self.values.lock().clone()
    }
}

#[derive(Debug)]
pub(crate) enum MetricStorage {
    Counter(CounterCell),
    Rate(RateCell),
    Trend(TrendCell),
}

impl MetricStorage {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(CounterCell::default()),
            MetricKind::Rate => Self::Rate(RateCell::default()),
            MetricKind::Trend => Self::Trend(TrendCell::default()),
        }
    }

    pub(crate) fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Rate(_) => MetricKind::Rate,
            Self::Trend(_) => MetricKind::Trend,
        }
    }

    pub(crate) fn record(&self, name: &str, sample: Sample) -> Result<()> {
        match (self, sample) {
            (Self::Counter(c), Sample::Counter(v)) => {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::InvalidCounterValue {
                        name: name.to_string(),
                        value: v,
                    });
                }
                c.add(v);
            }
            (Self::Rate(r), Sample::Rate(hit)) => r.add(hit),
            (Self::Trend(t), Sample::Trend(v)) => {
                if !v.is_finite() {
                    return Err(Error::InvalidTrendValue {
                        name: name.to_string(),
                        value: v,
                    });
                }
                t.push(v);
            }
            _ => {
                return Err(Error::KindMismatch {
                    name: name.to_string(),
                    existing: self.kind(),
                    requested: sample.kind(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_value_handles_empty_and_partial() {
        assert_eq!(RateValue { hits: 0, total: 0 }.rate(), 0.0);

        let r = RateValue { hits: 7, total: 10 };
        assert!((r.rate() - 0.7).abs() < 1e-12);
        assert_eq!(r.misses(), 3);
    }

    #[test]
    fn counter_cell_sums_fractional_contributions() {
        let c = CounterCell::default();
        c.add(1.5);
        c.add(2.0);
        assert_eq!(c.load(), 3.5);
    }

    #[test]
    fn storage_rejects_mismatched_samples() {
        let s = MetricStorage::new(MetricKind::Rate);
        let err = match s.record("errors", Sample::Trend(1.0)) {
            Ok(()) => panic!("expected kind mismatch"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            Error::KindMismatch {
                existing: MetricKind::Rate,
                requested: MetricKind::Trend,
                ..
            }
        ));
    }

    #[test]
    fn storage_rejects_negative_counter_contribution() {
        let s = MetricStorage::new(MetricKind::Counter);
        assert!(s.record("reqs", Sample::Counter(-1.0)).is_err());
        assert!(s.record("reqs", Sample::Counter(f64::NAN)).is_err());
        assert!(s.record("reqs", Sample::Counter(0.0)).is_ok());
    }

    #[test]
    fn metric_kind_round_trips_through_strings() {
        assert_eq!(MetricKind::Trend.to_string(), "trend");
        assert_eq!("rate".parse::<MetricKind>().ok(), Some(MetricKind::Rate));
    }
}
