use serde::Serialize;
use stampede_metrics::{MetricValue, MetricsSnapshot};

use crate::thresholds::{Threshold, ThresholdAgg};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub expression: String,
    /// `None` when the metric is missing or the aggregation does not apply to its kind.
    pub observed: Option<f64>,
    pub passed: bool,
}

pub fn evaluate_thresholds(
    snapshot: &MetricsSnapshot,
    thresholds: &[Threshold],
) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .map(|t| {
            let observed = snapshot
                .get(&t.metric)
                .and_then(|value| observed_value(value, t.expr.agg));
            let passed = observed.is_some_and(|v| t.expr.op.compare(v, t.expr.value));
            ThresholdOutcome {
                metric: t.metric.clone(),
                expression: t.source.clone(),
                observed,
                passed,
            }
        })
        .collect()
}

/// Overall verdict: every outcome passed. No thresholds means pass.
pub fn verdict(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}

fn observed_value(value: &MetricValue, agg: ThresholdAgg) -> Option<f64> {
    match (value, agg) {
        (MetricValue::Counter(c), ThresholdAgg::Count) => Some(c.count),
        (MetricValue::Rate(r), ThresholdAgg::Count) => Some(r.total as f64),
        (MetricValue::Rate(r), ThresholdAgg::Rate) => Some(r.rate()),
        (MetricValue::Trend(t), ThresholdAgg::Count) => Some(t.count() as f64),
        (MetricValue::Trend(t), ThresholdAgg::Avg) => Some(t.avg()),
        (MetricValue::Trend(t), ThresholdAgg::Min) => Some(t.min()),
        (MetricValue::Trend(t), ThresholdAgg::Max) => Some(t.max()),
        (MetricValue::Trend(t), ThresholdAgg::Med) => Some(t.median()),
        (MetricValue::Trend(t), ThresholdAgg::P(p)) => Some(t.percentile(p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::{ThresholdSet, compile_thresholds};
    use stampede_metrics::Registry;

    fn eval(reg: &Registry, metric: &str, exprs: &[&str]) -> Vec<ThresholdOutcome> {
        let thresholds = compile_thresholds(&[ThresholdSet::new(metric, exprs)])
            .unwrap_or_else(|e| panic!("{e}"));
        evaluate_thresholds(&reg.snapshot(), &thresholds)
    }

    fn rate_of(hits: u64, total: u64) -> Registry {
        let reg = Registry::default();
        for i in 0..total {
            reg.add_rate("errors", i < hits).unwrap_or_else(|e| panic!("{e}"));
        }
        reg
    }

    #[test]
    fn rate_comparison_is_strict() {
        let at_limit = eval(&rate_of(100, 1000), "errors", &["rate<0.1"]);
        assert!(!at_limit[0].passed);
        assert_eq!(at_limit[0].observed, Some(0.1));

        let below = eval(&rate_of(99, 1000), "errors", &["rate<0.1"]);
        assert!(below[0].passed);
    }

    #[test]
    fn trend_percentiles_and_averages() {
        let reg = Registry::default();
        for v in [100.0, 200.0, 300.0, 400.0, 500.0] {
            reg.add_trend("lat", v).unwrap_or_else(|e| panic!("{e}"));
        }
        let out = eval(
            &reg,
            "lat",
            &["p(90)<=500", "avg==300", "med<300", "count>=5", "max!=500"],
        );
        let passed: Vec<bool> = out.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![true, true, false, true, false]);
        assert_eq!(out[0].observed, Some(500.0));
    }

    #[test]
    fn missing_metric_fails_without_observation() {
        let out = eval(&Registry::default(), "nope", &["count<1"]);
        assert!(!out[0].passed);
        assert_eq!(out[0].observed, None);
        assert!(!verdict(&out));
    }

    #[test]
    fn aggregation_must_fit_the_metric_kind() {
        let reg = Registry::default();
        reg.add_counter("reqs", 3.0).unwrap_or_else(|e| panic!("{e}"));
        let out = eval(&reg, "reqs", &["p(95)<1", "count==3"]);
        assert_eq!(out[0].observed, None);
        assert!(!out[0].passed);
        assert!(out[1].passed);
    }

    #[test]
    fn verdict_with_no_thresholds_passes() {
        assert!(verdict(&[]));
    }
}
