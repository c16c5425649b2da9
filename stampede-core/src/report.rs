use serde::Serialize;
use stampede_metrics::{MetricValue, MetricsSnapshot};
use std::fmt::Write as _;

use crate::http::{HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS};
use crate::summary::RunResult;
use crate::thresholds_eval::ThresholdOutcome;

/// Which metrics feed the report's headline numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetrics {
    pub title: String,
    /// Counter holding total requests.
    pub requests: String,
    /// Counter holding successful requests; derived from the error rate when unset.
    pub successes: Option<String>,
    /// Rate whose hits are failures.
    pub error_rate: String,
    /// Trend of latencies in milliseconds.
    pub latency: String,
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self {
            title: "STAMPEDE RUN SUMMARY".to_string(),
            requests: HTTP_REQS.to_string(),
            successes: None,
            error_rate: HTTP_REQ_FAILED.to_string(),
            latency: HTTP_REQ_DURATION.to_string(),
        }
    }
}

const HIGH_ERROR_RATE: f64 = 0.05;
const SLOW_P95_MS: f64 = 3000.0;
const LOW_SUCCESS_RATIO: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Hint {
    ErrorRateOk,
    HighErrorRate,
    LatencyOk,
    HighLatency,
    SuccessRatioOk,
    LowSuccessRatio,
}

impl Hint {
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Self::HighErrorRate | Self::HighLatency | Self::LowSuccessRatio
        )
    }

    fn describe(self) -> &'static str {
        match self {
            Self::ErrorRateOk => "error rate acceptable",
            Self::HighErrorRate => "high error rate detected",
            Self::LatencyOk => "p95 latency within range",
            Self::HighLatency => "high p95 latency under load",
            Self::SuccessRatioOk => "success ratio acceptable",
            Self::LowSuccessRatio => "success ratio below 90%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub total_requests: u64,
    pub successful: u64,
    /// Fraction in `0..=1`.
    pub error_rate: f64,
    pub latency_avg_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub iterations: u64,
    pub elapsed_secs: f64,
    pub peak_vus: u64,
    pub aborted: bool,
    pub thresholds: Vec<ThresholdOutcome>,
    pub failed_checks: Vec<(String, u64)>,
    pub passed: bool,
    pub hints: Vec<Hint>,
}

impl Report {
    pub fn build(result: &RunResult, metrics: &ReportMetrics) -> Self {
        let snap = &result.metrics;

        let total_requests = snap.counter_or_zero(&metrics.requests) as u64;
        let error_rate = rate_or_zero(snap, &metrics.error_rate);
        let successful = match &metrics.successes {
            Some(name) => snap.counter_or_zero(name) as u64,
            None => (total_requests as f64 * (1.0 - error_rate)).round() as u64,
        };

        let trend = snap.get(&metrics.latency).and_then(MetricValue::as_trend);
        let (avg, p95, p99) = trend.map_or((0.0, 0.0, 0.0), |t| {
            (t.avg(), t.percentile(95.0), t.percentile(99.0))
        });

        let failed_checks = snap
            .checks()
            .iter()
            .filter(|c| c.fails > 0)
            .map(|c| (c.name.clone(), c.fails))
            .collect();

        Self {
            title: metrics.title.clone(),
            total_requests,
            successful,
            error_rate,
            latency_avg_ms: avg,
            latency_p95_ms: p95,
            latency_p99_ms: p99,
            iterations: result.iterations_total,
            elapsed_secs: result.elapsed.as_secs_f64(),
            peak_vus: result.peak_vus,
            aborted: result.aborted,
            thresholds: result.thresholds.clone(),
            failed_checks,
            passed: result.passed,
            hints: analyze(total_requests, successful, error_rate, p95),
        }
    }
}

fn rate_or_zero(snap: &MetricsSnapshot, name: &str) -> f64 {
    snap.get(name)
        .and_then(MetricValue::as_rate)
        .map_or(0.0, |r| r.rate())
}

fn analyze(total: u64, successful: u64, error_rate: f64, p95_ms: f64) -> Vec<Hint> {
    let mut hints = vec![if error_rate > HIGH_ERROR_RATE {
        Hint::HighErrorRate
    } else {
        Hint::ErrorRateOk
    }];
    hints.push(if p95_ms > SLOW_P95_MS {
        Hint::HighLatency
    } else {
        Hint::LatencyOk
    });
    hints.push(if (successful as f64) < total as f64 * LOW_SUCCESS_RATIO {
        Hint::LowSuccessRatio
    } else {
        Hint::SuccessRatioOk
    });
    hints
}

const RULE_WIDTH: usize = 62;

pub fn render_text(report: &Report) -> String {
    let heavy = "═".repeat(RULE_WIDTH);
    let light = "─".repeat(RULE_WIDTH - 4);
    let mut out = String::new();

    let _ = writeln!(out, "\n{heavy}");
    let _ = writeln!(out, "  {}", report.title);
    let _ = writeln!(out, "{heavy}\n");

    let _ = writeln!(out, "  REQUESTS");
    let _ = writeln!(out, "  {light}");
    row(&mut out, "Total requests", report.total_requests);
    row(&mut out, "Successful", report.successful);
    row(&mut out, "Error rate", format!("{:.2}%", report.error_rate * 100.0));
    row(&mut out, "Iterations", report.iterations);
    row(&mut out, "Peak VUs", report.peak_vus);
    row(&mut out, "Duration", format!("{:.1}s", report.elapsed_secs));
    if report.aborted {
        row(&mut out, "Note", "run aborted before the schedule finished");
    }

    let _ = writeln!(out, "\n  LATENCY");
    let _ = writeln!(out, "  {light}");
    row(&mut out, "Average", format!("{:.0}ms", report.latency_avg_ms));
    row(&mut out, "p95", format!("{:.0}ms", report.latency_p95_ms));
    row(&mut out, "p99", format!("{:.0}ms", report.latency_p99_ms));

    if !report.thresholds.is_empty() {
        let _ = writeln!(out, "\n  THRESHOLDS");
        let _ = writeln!(out, "  {light}");
        for t in &report.thresholds {
            let mark = if t.passed { "✓" } else { "✗" };
            let observed = t
                .observed
                .map_or_else(|| "no data".to_string(), |v| format!("{v:.4}"));
            let _ = writeln!(
                out,
                "  {mark} {}: {} (observed {observed})",
                t.metric, t.expression
            );
        }
    }

    if !report.failed_checks.is_empty() {
        let _ = writeln!(out, "\n  FAILED CHECKS");
        let _ = writeln!(out, "  {light}");
        for (name, fails) in &report.failed_checks {
            let _ = writeln!(out, "  ✗ {name}: {fails} failed");
        }
    }

    let _ = writeln!(out);
    row(&mut out, "RESULT", if report.passed { "PASS" } else { "FAIL" });

    let _ = writeln!(out, "\n  ANALYSIS");
    let _ = writeln!(out, "  {light}");
    for hint in &report.hints {
        let mark = if hint.is_warning() { "!" } else { "✓" };
        let _ = writeln!(out, "  {mark} {}", hint.describe());
    }
    let _ = writeln!(out, "\n{heavy}");

    out
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<20} {value}", format!("{label}:"));
}

/// Complete archival form of a run: every metric, check, and threshold outcome.
pub fn snapshot_json(result: &RunResult) -> serde_json::Value {
    serde_json::json!({
        "passed": result.passed,
        "aborted": result.aborted,
        "elapsed_ms": result.elapsed.as_secs_f64() * 1000.0,
        "peak_vus": result.peak_vus,
        "requests_total": result.requests_total,
        "iterations_total": result.iterations_total,
        "thresholds": result.thresholds,
        "metrics": result.metrics,
    })
}
