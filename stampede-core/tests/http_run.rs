use std::sync::Arc;
use std::time::Duration;

use stampede_core::{
    HTTP_REQ_FAILED, HTTP_REQS, HttpClient, ITERATION_FAILED, IterationContext, IterationOutcome,
    RunOptions, Runner, Stage, ThresholdSet,
};
use stampede_testserver::{SLOW_RESPONSE_DELAY, TestServer};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn requests_against_a_live_server_are_counted() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let hello = server.urls().hello.clone();
    let failing = server.urls().status(500);

    let scenario = move |ctx: IterationContext| {
        let hello = hello.clone();
        let failing = failing.clone();
        async move {
            let ok = ctx.client().get(&hello).await.map_err(|e| e.to_string())?;
            let bad = ctx.client().get(&failing).await.map_err(|e| e.to_string())?;
            ctx.check("hello is 200", ok.status == 200);
            Ok::<_, String>(IterationOutcome::success().with_status(bad.status))
        }
    };

    let options = RunOptions {
        stages: vec![Stage::new(Duration::from_millis(600), 2)],
        control_interval: Duration::from_millis(50),
        request_timeout: Some(Duration::from_secs(5)),
        thresholds: vec![
            ThresholdSet::new(HTTP_REQ_FAILED, &["rate<0.6"]),
            ThresholdSet::new("checks", &["rate==1"]),
        ],
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(HttpClient::default()))?;
    let result = runner.run(scenario).await?;

    let sent = result.metrics.counter_or_zero(HTTP_REQS) as u64;
    anyhow::ensure!(sent > 0 && sent % 2 == 0, "http_reqs={sent}");
    anyhow::ensure!(sent == server.stats().requests_total());

    let failed = result
        .metrics
        .get(HTTP_REQ_FAILED)
        .and_then(|v| v.as_rate())
        .ok_or_else(|| anyhow::anyhow!("missing http_req_failed"))?;
    anyhow::ensure!(failed.hits * 2 == failed.total, "{failed:?}");
    anyhow::ensure!(result.passed, "{:?}", result.thresholds);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn transport_errors_are_absorbed_as_failed_iterations() -> anyhow::Result<()> {
    let scenario = |ctx: IterationContext| async move {
        ctx.client()
            .get("http://127.0.0.1:1/unreachable")
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(IterationOutcome::success())
    };

    let options = RunOptions {
        stages: vec![Stage::new(Duration::from_millis(300), 1)],
        control_interval: Duration::from_millis(50),
        thresholds: vec![ThresholdSet::new("iteration_failed", &["rate<0.1"])],
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(HttpClient::new(Some(Duration::from_millis(200)))))?;
    let result = runner.run(scenario).await?;

    anyhow::ensure!(result.iterations_total > 0);
    anyhow::ensure!(!result.passed);
    let failed = result
        .metrics
        .get(HTTP_REQ_FAILED)
        .and_then(|v| v.as_rate())
        .ok_or_else(|| anyhow::anyhow!("missing http_req_failed"))?;
    anyhow::ensure!(failed.hits == failed.total);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_timeout_fails_slow_responses() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let slow = server.urls().slow.clone();

    let scenario = move |ctx: IterationContext| {
        let slow = slow.clone();
        async move {
            match ctx.client().get(&slow).await {
                Ok(resp) => Ok(IterationOutcome::success().with_status(resp.status)),
                Err(err) => Err(err.to_string()),
            }
        }
    };

    let options = RunOptions {
        stages: vec![Stage::new(Duration::from_millis(400), 1)],
        control_interval: Duration::from_millis(50),
        request_timeout: Some(SLOW_RESPONSE_DELAY / 5),
        thresholds: vec![ThresholdSet::new(HTTP_REQ_FAILED, &["rate<0.1"])],
        ..RunOptions::default()
    };
    let runner = Runner::new(options, Arc::new(HttpClient::default()))?;
    let result = runner.run(scenario).await?;
    server.shutdown().await;

    anyhow::ensure!(result.iterations_total > 0);
    anyhow::ensure!(!result.passed, "{:?}", result.thresholds);

    let failed = result
        .metrics
        .get(HTTP_REQ_FAILED)
        .and_then(|v| v.as_rate())
        .ok_or_else(|| anyhow::anyhow!("missing http_req_failed"))?;
    anyhow::ensure!(failed.total > 0 && failed.hits == failed.total, "{failed:?}");

    let iterations_failed = result
        .metrics
        .get(ITERATION_FAILED)
        .and_then(|v| v.as_rate())
        .ok_or_else(|| anyhow::anyhow!("missing iteration_failed"))?;
    anyhow::ensure!(iterations_failed.hits == iterations_failed.total);
    Ok(())
}
