#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSnapshot {
    pub total: f64,
}

impl CounterSnapshot {
    pub fn new(total: f64) -> Self {
        Self { total }
    }

    pub fn delta_since(self, prev: Option<Self>) -> f64 {
        match prev {
            Some(prev) => (self.total - prev.total).max(0.0),
            None => self.total,
        }
    }

    pub fn per_sec_since(self, prev: Option<Self>, dt_secs: f64) -> f64 {
        per_sec(self.delta_since(prev), dt_secs)
    }
}

#[inline]
pub fn per_sec(delta: f64, dt_secs: f64) -> f64 {
    // `dt_secs` is always > 0 when driven by an interval, but a zero would divide by zero.
    let dt = dt_secs.max(1e-9);
    delta / dt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_snapshot_delta_and_rate() {
        let now = CounterSnapshot::new(10.0);
        assert_eq!(now.delta_since(None), 10.0);
        assert_eq!(now.delta_since(Some(CounterSnapshot::new(7.0))), 3.0);
        assert_eq!(now.delta_since(Some(CounterSnapshot::new(999.0))), 0.0);

        let rps = now.per_sec_since(Some(CounterSnapshot::new(7.0)), 1.0);
        assert!((rps - 3.0).abs() < 1e-9);

        // dt=0 must not panic or produce infinity.
        assert!(now.per_sec_since(Some(CounterSnapshot::new(7.0)), 0.0).is_finite());
    }
}
