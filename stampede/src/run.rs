use anyhow::Context as _;
use std::sync::Arc;

use stampede_core::{HttpClient, Report, RunHandle, Runner};

use crate::cli::RunArgs;
use crate::config::{self, ResolvedConfig};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::scenario::{DEFAULT_REQUEST_TIMEOUT, TicketScenario};

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let resolved = resolve_config(&args).await.map_err(RunError::InvalidInput)?;
    let ResolvedConfig {
        base_url,
        options,
        summary_export,
        report: report_metrics,
    } = resolved;

    let scenario = TicketScenario::new(
        &base_url,
        options.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
    );

    let mut runner =
        Runner::new(options, Arc::new(HttpClient::default())).map_err(RunError::from_core)?;

    if let Err(err) = out.print_header(&base_url, runner.schedule()) {
        tracing::error!(error = format!("{err:#}"), "failed to print run header");
    }
    if let Some(progress) = out.progress() {
        runner = runner.with_progress(progress);
    }

    tracing::info!(
        base_url = %base_url,
        stages = runner.schedule().stages().len(),
        total_secs = runner.schedule().total_duration().as_secs_f64(),
        "starting run"
    );

    let interrupt = tokio::spawn(abort_on_interrupt(runner.handle()));
    let result = runner.run(scenario).await;
    interrupt.abort();
    let result = result.map_err(RunError::from_core)?;

    let report = Report::build(&result, &report_metrics);
    if let Err(err) = out.print_summary(&report, &result) {
        tracing::error!(error = format!("{err:#}"), "failed to print summary");
    }

    export_summary(&summary_export, &result);

    Ok(ExitCode::from_thresholds(result.passed))
}

async fn resolve_config(args: &RunArgs) -> anyhow::Result<ResolvedConfig> {
    let file = match &args.config {
        Some(path) => config::load_config_from_yaml(path).await?,
        None => config::ticket_stress_profile(),
    };
    config::resolve(args, file)
}

async fn abort_on_interrupt(handle: RunHandle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received, draining virtual users");
        handle.abort();
    }
}

/// The export is best effort: a write failure is logged and never changes the verdict.
fn export_summary(rel: &str, result: &stampede_core::RunResult) {
    let written = std::env::current_dir()
        .context("failed to resolve current working directory")
        .and_then(|cwd| {
            stampede_core::write_summary_json(&cwd, rel, result)
                .with_context(|| format!("failed to write summary export `{rel}`"))
        });

    match written {
        Ok(path) => tracing::info!(path = %path.display(), "summary exported"),
        Err(err) => tracing::error!(error = format!("{err:#}"), "summary export failed"),
    }
}
