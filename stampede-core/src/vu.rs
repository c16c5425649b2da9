use futures::FutureExt as _;
use stampede_metrics::Registry;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::http::RequestClient;
use crate::iteration_metrics::record_iteration;
use crate::run::RunContext;
use crate::scenario::{IterationOutcome, Scenario};
use crate::signal::StopSignal;

pub const CHECKS: &str = "checks";

/// State owned by one worker task.
#[derive(Debug)]
pub struct WorkerContext {
    pub vu_id: u64,
    pub iteration: u64,
    pub stop: Arc<StopSignal>,
}

impl WorkerContext {
    pub fn new(vu_id: u64, stop: Arc<StopSignal>) -> Self {
        Self {
            vu_id,
            iteration: 0,
            stop,
        }
    }

    fn should_stop(&self, global: &StopSignal) -> bool {
        self.stop.is_stopped() || global.is_stopped()
    }
}

/// What a scenario sees of the run during one iteration.
#[derive(Debug, Clone)]
pub struct IterationContext {
    vu_id: u64,
    iteration: u64,
    live_vus: u64,
    metrics: Arc<Registry>,
    client: RequestClient,
}

impl IterationContext {
    pub fn new(
        vu_id: u64,
        iteration: u64,
        live_vus: u64,
        metrics: Arc<Registry>,
        client: RequestClient,
    ) -> Self {
        Self {
            vu_id,
            iteration,
            live_vus,
            metrics,
            client,
        }
    }

    /// 1-based VU ordinal; never reused within a run.
    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    /// 0-based iteration number within this VU.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// VUs the pool considered live when this iteration started.
    pub fn live_vus(&self) -> u64 {
        self.live_vus
    }

    pub fn metrics(&self) -> &Registry {
        &self.metrics
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    /// Records a named check and returns `passed`.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        if let Err(err) = self.metrics.add_rate(CHECKS, passed) {
            tracing::warn!(error = %err, check = name, "failed to record check");
        }
        self.metrics.record_check(name, passed);
        passed
    }
}

pub(crate) async fn run_vu<S: Scenario>(
    mut worker: WorkerContext,
    run: Arc<RunContext>,
    scenario: Arc<S>,
) {
    tracing::trace!(vu = worker.vu_id, "vu started");

    while !worker.should_stop(&run.stop) {
        let ctx = IterationContext::new(
            worker.vu_id,
            worker.iteration,
            run.live_vus(),
            run.metrics.clone(),
            run.client.clone(),
        );

        let started = Instant::now();
        let outcome = run_iteration(scenario.as_ref(), ctx, run.iteration_timeout).await;
        let duration = started.elapsed();

        if !outcome.success {
            tracing::debug!(
                vu = worker.vu_id,
                iteration = worker.iteration,
                status = ?outcome.status,
                message = outcome.message.as_deref().unwrap_or(""),
                "iteration failed"
            );
        }
        if let Err(err) = record_iteration(&run.metrics, &outcome, duration) {
            tracing::warn!(error = %err, "failed to record iteration metrics");
        }
        worker.iteration += 1;

        let pause = run.think_time.at(run.live_vus());
        if !pause.is_zero() && !worker.should_stop(&run.stop) {
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = worker.stop.wait() => {}
                () = run.stop.wait() => {}
            }
        }
    }

    tracing::trace!(vu = worker.vu_id, iterations = worker.iteration, "vu stopped");
}

/// Runs the scenario once; errors, timeouts and panics become failed outcomes.
pub(crate) async fn run_iteration<S: Scenario>(
    scenario: &S,
    ctx: IterationContext,
    timeout: Option<Duration>,
) -> IterationOutcome {
    let vu = ctx.vu_id();
    let call = AssertUnwindSafe(async { scenario.iteration(ctx).await }).catch_unwind();

    let res = match timeout {
        Some(timeout) => match tokio::time::timeout(timeout, call).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(vu, ?timeout, "iteration timed out");
                return IterationOutcome::failed(format!("iteration timed out after {timeout:?}"));
            }
        },
        None => call.await,
    };

    match res {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            let message = err.to_string();
            tracing::warn!(vu, error = %message, "iteration returned an error");
            IterationOutcome::failed(message)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(vu, panic = %message, "iteration panicked");
            IterationOutcome::failed(format!("iteration panicked: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Transport;
    use futures::future::BoxFuture;
    use stampede_http::{HttpRequest, HttpResponse};

    struct NoTransport;

    impl Transport for NoTransport {
        fn send(&self, _req: HttpRequest) -> BoxFuture<'_, stampede_http::Result<HttpResponse>> {
            Box::pin(async { Err(stampede_http::Error::Timeout(Duration::ZERO)) })
        }
    }

    fn ctx() -> IterationContext {
        let metrics = Arc::new(Registry::default());
        let client = RequestClient::new(Arc::new(NoTransport), metrics.clone(), None);
        IterationContext::new(1, 0, 1, metrics, client)
    }

    #[tokio::test]
    async fn errors_become_failed_outcomes() {
        let scenario = |_ctx: IterationContext| async { Err::<IterationOutcome, _>("refused") };
        let outcome = run_iteration(&scenario, ctx(), None).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("refused"));
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let scenario = |_ctx: IterationContext| async {
            if true {
                panic!("scenario blew up");
            }
            Ok::<_, String>(IterationOutcome::success())
        };
        let outcome = run_iteration(&scenario, ctx(), None).await;
        assert!(!outcome.success);
        assert!(
            outcome
                .message
                .as_deref()
                .is_some_and(|m| m.contains("scenario blew up"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_iterations_time_out() {
        let scenario = |_ctx: IterationContext| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(IterationOutcome::success())
        };
        let outcome = run_iteration(&scenario, ctx(), Some(Duration::from_secs(5))).await;
        assert!(!outcome.success);
        assert!(
            outcome
                .message
                .as_deref()
                .is_some_and(|m| m.contains("timed out"))
        );
    }

    #[test]
    fn checks_feed_the_rate_and_per_name_tally() {
        let ctx = ctx();
        assert!(ctx.check("status is 201", true));
        assert!(!ctx.check("status is 201", false));

        let snap = ctx.metrics().snapshot();
        let checks = snap
            .get(CHECKS)
            .and_then(|v| v.as_rate())
            .unwrap_or_else(|| panic!("missing checks rate"));
        assert_eq!((checks.hits, checks.total), (1, 2));
        assert_eq!(snap.checks_failed_total(), 1);
    }
}
