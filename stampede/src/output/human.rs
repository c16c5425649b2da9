use std::io::{self, Write};
use std::sync::Arc;
use std::sync::Mutex;

mod duration;
mod format;
mod progress;

use duration::{format_duration, format_duration_single};
use format::format_rate;
use progress::HumanProgress;
use stampede_core::{ProgressFn, ProgressUpdate, RampSchedule, Report, RunResult};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, base_url: &str, schedule: &RampSchedule) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        write_header(&mut out, base_url, schedule)?;
        out.flush()?;
        Ok(())
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        let prev_errors: Arc<Mutex<u64>> = Arc::new(Mutex::new(0));

        Some(Arc::new(move |u| {
            let errors_total = u
                .metrics
                .failed_requests_total
                .saturating_add(u.metrics.checks_failed_total);
            let errors_delta = {
                let mut prev = prev_errors
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let delta = errors_total.saturating_sub(*prev);
                *prev = errors_total;
                delta
            };

            let message = progress_message(&u, errors_delta, errors_total);
            progress.update(u.total_duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, report: &Report, result: &RunResult) -> anyhow::Result<()> {
        self.progress.finish();

        let mut out = std::io::stdout().lock();
        let mut err = std::io::stderr().lock();
        write_summary(&mut out, &mut err, report, result)?;
        out.flush()?;
        Ok(())
    }
}

fn write_header(out: &mut impl Write, base_url: &str, schedule: &RampSchedule) -> io::Result<()> {
    writeln!(out, "target: {base_url}")?;
    writeln!(
        out,
        "stages: {} duration={} peak_vus={}",
        schedule.stages().len(),
        format_duration(schedule.total_duration()),
        schedule.peak_target()
    )?;
    for (idx, stage) in schedule.stages().iter().enumerate() {
        writeln!(
            out,
            "  {}. {} -> {} vus",
            idx + 1,
            format_duration(stage.duration),
            stage.target
        )?;
    }
    writeln!(out)
}

/// Report text to `out`; failed thresholds are repeated on `err`.
fn write_summary(
    out: &mut impl Write,
    err: &mut impl Write,
    report: &Report,
    result: &RunResult,
) -> io::Result<()> {
    out.write_all(stampede_core::render_text(report).as_bytes())?;

    let failed: Vec<_> = result.failed_thresholds().collect();
    if failed.is_empty() {
        return Ok(());
    }
    writeln!(err, "thresholds failed:")?;
    for t in failed {
        match t.observed {
            Some(obs) => writeln!(err, "  {}: {} (observed {obs})", t.metric, t.expression)?,
            None => writeln!(err, "  {}: {} (missing series)", t.metric, t.expression)?,
        }
    }
    Ok(())
}

fn progress_message(u: &ProgressUpdate, errors_delta: u64, errors_total: u64) -> String {
    let rates = format!(
        " iters/s={} rps={} errors={errors_delta}/{errors_total}",
        format_rate(u.metrics.iterations_per_sec_now),
        format_rate(u.metrics.rps_now),
    );

    match &u.stage {
        Some(stage) => format!(
            "stage={}/{} target={} vus={}/{} elapsed={} stage_remaining={}{rates}",
            stage.index + 1,
            stage.count,
            stage.end_target,
            u.live_vus,
            u.desired_vus,
            format_duration_single(u.elapsed),
            format_duration_single(stage.stage_remaining),
        ),
        None => format!(
            "vus={}/{} elapsed={}{rates}",
            u.live_vus,
            u.desired_vus,
            format_duration_single(u.elapsed)
        ),
    }
}
