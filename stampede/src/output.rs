use crate::cli::OutputFormat;
use stampede_core::{ProgressFn, RampSchedule, Report, RunResult};

mod human;
mod json;

/// Console sinks. Write failures are returned, never panicked on; callers log them.
pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, base_url: &str, schedule: &RampSchedule) -> anyhow::Result<()>;
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, report: &Report, result: &RunResult) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use stampede_core::{Registry, Report, ReportMetrics, RunResult};
    use std::io;
    use std::time::Duration;

    /// Sink that rejects every write, like stdout redirected to a full disk.
    pub(crate) struct FullDisk;

    impl io::Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn empty_run() -> (Report, RunResult) {
        let result = RunResult {
            metrics: Registry::default().snapshot(),
            thresholds: Vec::new(),
            passed: true,
            requests_total: 0,
            iterations_total: 0,
            elapsed: Duration::from_secs(1),
            peak_vus: 0,
            aborted: false,
        };
        (Report::build(&result, &ReportMetrics::default()), result)
    }
}
