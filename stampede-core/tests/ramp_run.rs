use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use stampede_core::{
    HttpRequest, HttpResponse, IterationContext, IterationOutcome, RunOptions, Runner, Stage,
    ThinkTime, ThresholdSet, Transport,
};

struct Unused;

impl Transport for Unused {
    fn send(&self, _req: HttpRequest) -> BoxFuture<'_, stampede_http::Result<HttpResponse>> {
        Box::pin(async { Err(stampede_http::Error::Timeout(Duration::ZERO)) })
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

async fn always_ok(ctx: IterationContext) -> Result<IterationOutcome, String> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    ctx.metrics()
        .add_counter("requests", 1.0)
        .map_err(|e| e.to_string())?;
    ctx.metrics()
        .add_rate("errors", false)
        .map_err(|e| e.to_string())?;
    Ok(IterationOutcome::success())
}

#[tokio::test(start_paused = true)]
async fn staged_ramp_with_always_successful_scenario_passes() -> anyhow::Result<()> {
    let options = RunOptions {
        stages: vec![Stage::new(secs(30), 5), Stage::new(secs(60), 10)],
        thresholds: vec![ThresholdSet::new("errors", &["rate<0.1"])],
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(Unused))?;
    let result = runner.run(always_ok).await?;

    let requests = result.metrics.counter_or_zero("requests");
    anyhow::ensure!(
        requests > 0.0 && requests as u64 == result.iterations_total,
        "requests={requests} iterations={}",
        result.iterations_total
    );

    let errors = result
        .metrics
        .get("errors")
        .and_then(|v| v.as_rate())
        .ok_or_else(|| anyhow::anyhow!("missing errors rate"))?;
    anyhow::ensure!(errors.rate() == 0.0);
    anyhow::ensure!(result.passed, "thresholds: {:?}", result.thresholds);
    anyhow::ensure!(result.peak_vus == 10, "peak_vus={}", result.peak_vus);
    anyhow::ensure!(!result.aborted);
    anyhow::ensure!(result.elapsed >= secs(90), "elapsed={:?}", result.elapsed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_schedule_runs_no_iterations() -> anyhow::Result<()> {
    let runner = Runner::new(RunOptions::default(), Arc::new(Unused))?;
    let result = runner.run(always_ok).await?;

    anyhow::ensure!(result.iterations_total == 0);
    anyhow::ensure!(result.peak_vus == 0);
    anyhow::ensure!(result.passed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn live_vus_track_the_schedule() -> anyhow::Result<()> {
    let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let progress = {
        let observed = observed.clone();
        Arc::new(move |u: stampede_core::ProgressUpdate| {
            observed.lock().push((u.elapsed, u.desired_vus, u.live_vus));
        })
    };

    let options = RunOptions {
        stages: vec![Stage::new(secs(10), 10), Stage::new(secs(10), 0)],
        think_time: ThinkTime::constant(Duration::from_millis(100)),
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(Unused))?.with_progress(progress);
    let result = runner.run(always_ok).await?;

    let observed = observed.lock();
    anyhow::ensure!(!observed.is_empty());
    for (elapsed, desired, live) in observed.iter() {
        anyhow::ensure!(desired == live, "at {elapsed:?}: desired={desired} live={live}");
    }
    let max_desired = observed.iter().map(|(_, desired, _)| *desired).max();
    anyhow::ensure!(max_desired == Some(10), "max desired={max_desired:?}");
    anyhow::ensure!(result.peak_vus == 10);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abort_stops_the_run_and_still_reports() -> anyhow::Result<()> {
    let options = RunOptions {
        stages: vec![Stage::new(secs(600), 4)],
        thresholds: vec![ThresholdSet::new("iterations", &["count>0"])],
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(Unused))?;
    let handle = runner.handle();

    tokio::spawn(async move {
        tokio::time::sleep(secs(60)).await;
        handle.abort();
    });
    let result = runner.run(always_ok).await?;

    anyhow::ensure!(result.aborted);
    anyhow::ensure!(result.elapsed < secs(61), "elapsed={:?}", result.elapsed);
    anyhow::ensure!(result.iterations_total > 0);
    anyhow::ensure!(result.passed);
    Ok(())
}

#[test]
fn malformed_threshold_is_rejected_before_the_run() {
    let options = RunOptions {
        stages: vec![Stage::new(secs(1), 1)],
        thresholds: vec![ThresholdSet::new("errors", &["rate<<0.1"])],
        ..RunOptions::default()
    };
    assert!(matches!(
        Runner::new(options, Arc::new(Unused)),
        Err(stampede_core::Error::InvalidThreshold { .. })
    ));
}
