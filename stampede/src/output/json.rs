use serde::Serialize;
use anyhow::Context as _;
use std::io::Write;
use std::sync::Arc;

use stampede_core::{ProgressFn, ProgressUpdate, RampSchedule, Report, RunResult};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _base_url: &str, _schedule: &RampSchedule) -> anyhow::Result<()> {
        Ok(())
    }

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            if let Err(err) = emit_json_line(&mut std::io::stdout().lock(), &line) {
                tracing::error!(error = format!("{err:#}"), tick = u.tick, "failed to write progress line");
            }
        }))
    }

    fn print_summary(&self, report: &Report, result: &RunResult) -> anyhow::Result<()> {
        let line = JsonSummaryLine {
            kind: "summary",
            report,
            metrics: stampede_core::snapshot_json(result),
        };
        emit_json_line(&mut std::io::stdout().lock(), &line)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub total_secs: f64,

    pub stage: Option<usize>,
    pub stages: Option<usize>,
    pub desired_vus: u64,
    pub live_vus: u64,

    pub iterations_total: u64,
    pub iterations_per_sec: f64,
    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub failed_requests_total: u64,
    pub checks_failed_total: u64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        total_secs: u.total_duration.as_secs_f64(),

        stage: u.stage.as_ref().map(|s| s.index + 1),
        stages: u.stage.as_ref().map(|s| s.count),
        desired_vus: u.desired_vus,
        live_vus: u.live_vus,

        iterations_total: u.metrics.iterations_total,
        iterations_per_sec: u.metrics.iterations_per_sec_now,
        requests_total: u.metrics.requests_total,
        requests_per_sec: u.metrics.rps_now,
        failed_requests_total: u.metrics.failed_requests_total,
        checks_failed_total: u.metrics.checks_failed_total,
    }
}

#[derive(Debug, Serialize)]
struct JsonSummaryLine<'a> {
    kind: &'static str,
    report: &'a Report,
    metrics: serde_json::Value,
}

fn emit_json_line<T: Serialize>(out: &mut impl Write, line: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, line).context("failed to encode json line")?;
    writeln!(out).context("failed to terminate json line")?;
    out.flush().context("failed to flush json line")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use stampede_core::{LiveMetrics, StageSnapshot};
    use std::time::Duration;

    #[test]
    fn summary_line_is_one_json_object() {
        let (report, result) = crate::output::test_support::empty_run();
        let line = JsonSummaryLine {
            kind: "summary",
            report: &report,
            metrics: stampede_core::snapshot_json(&result),
        };
        let mut out = Vec::new();
        emit_json_line(&mut out, &line).unwrap_or_else(|e| panic!("{e:#}"));

        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.lines().count(), 1);
        let v: Value = serde_json::from_str(text.trim_end()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(v.pointer("/metrics/passed").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn write_failures_surface_as_errors() {
        let (report, result) = crate::output::test_support::empty_run();
        let line = JsonSummaryLine {
            kind: "summary",
            report: &report,
            metrics: stampede_core::snapshot_json(&result),
        };
        let res = emit_json_line(&mut crate::output::test_support::FullDisk, &line);
        assert!(res.is_err());
    }

    #[test]
    fn progress_line_has_kind_and_stage() {
        let update = ProgressUpdate {
            tick: 2,
            elapsed: Duration::from_millis(1500),
            total_duration: Duration::from_secs(10),
            stage: Some(StageSnapshot {
                index: 0,
                count: 2,
                stage_elapsed: Duration::from_millis(1500),
                stage_remaining: Duration::from_millis(3500),
                start_target: 0,
                end_target: 4,
                current_target: 1,
            }),
            desired_vus: 1,
            live_vus: 1,
            metrics: LiveMetrics {
                requests_total: 12,
                ..LiveMetrics::default()
            },
        };

        let v: Value = match serde_json::to_value(build_progress_line(&update)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("progress"));
        assert_eq!(v.get("stage").and_then(Value::as_u64), Some(1));
        assert_eq!(v.get("stages").and_then(Value::as_u64), Some(2));
        assert_eq!(v.get("elapsed_secs").and_then(Value::as_f64), Some(1.5));
        assert_eq!(v.get("requests_total").and_then(Value::as_u64), Some(12));
    }
}
