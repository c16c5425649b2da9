use serde::Serialize;
use std::sync::Arc;

/// Percentiles reported in summaries and the JSON snapshot.
pub const SUMMARY_PERCENTILES: [f64; 3] = [90.0, 95.0, 99.0];

/// Immutable, sorted copy of every observation a trend received.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendValue {
    sorted: Arc<[f64]>,
    sum: f64,
}

impl TrendValue {
    #[must_use]
    pub fn from_values(mut values: Vec<f64>) -> Self {
        values.sort_unstable_by(f64::total_cmp);
        let sum = values.iter().sum();
        Self {
            sorted: Arc::from(values.into_boxed_slice()),
            sum,
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.sorted.len() as u64
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    #[must_use]
    pub fn avg(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        self.sum / self.sorted.len() as f64
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.sorted.first().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.sorted.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Nearest-rank percentile: rank `ceil(p/100 * n) - 1`, clamped to the sample range.
    ///
    /// `p` is in `0..=100`; an empty trend yields 0.
    #[must_use]
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.sorted.len();
        if n == 0 {
            return 0.0;
        }

        // Multiply before dividing so whole percentiles stay exact (95 * 20 / 100 == 19).
        let rank = (p.clamp(0.0, 100.0) * n as f64 / 100.0).ceil() as i64 - 1;
        let idx = rank.clamp(0, n as i64 - 1) as usize;
        self.sorted[idx]
    }

    pub fn values(&self) -> &[f64] {
        &self.sorted
    }
}

impl Serialize for TrendValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap as _;

        let mut m = serializer.serialize_map(Some(5 + SUMMARY_PERCENTILES.len()))?;
        m.serialize_entry("count", &self.count())?;
        m.serialize_entry("avg", &self.avg())?;
        m.serialize_entry("min", &self.min())?;
        m.serialize_entry("med", &self.median())?;
        m.serialize_entry("max", &self.max())?;
        for p in SUMMARY_PERCENTILES {
            m.serialize_entry(&format!("p({p})"), &self.percentile(p))?;
        }
        m.end()
    }
}
