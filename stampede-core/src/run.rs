use stampede_metrics::Registry;
use stampede_metrics::agg::CounterSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::clock::RunClock;
use crate::config::RunOptions;
use crate::error::Result;
use crate::http::{HTTP_REQ_FAILED, HTTP_REQS, RequestClient, Transport};
use crate::iteration_metrics::ITERATIONS;
use crate::pool::WorkerPool;
use crate::progress::{LiveMetrics, ProgressFn, ProgressUpdate};
use crate::scenario::{Scenario, ThinkTime};
use crate::schedule::RampSchedule;
use crate::signal::StopSignal;
use crate::summary::RunResult;
use crate::thresholds::{Threshold, compile_thresholds};
use crate::thresholds_eval::{evaluate_thresholds, verdict};

/// Run-scoped state shared with every VU.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) metrics: Arc<Registry>,
    pub(crate) client: RequestClient,
    pub(crate) stop: Arc<StopSignal>,
    pub(crate) think_time: ThinkTime,
    pub(crate) iteration_timeout: Option<Duration>,
    live_vus: AtomicU64,
}

impl RunContext {
    pub(crate) fn live_vus(&self) -> u64 {
        self.live_vus.load(Ordering::Relaxed)
    }

    pub(crate) fn set_live_vus(&self, n: u64) {
        self.live_vus.store(n, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use futures::future::BoxFuture;
        use stampede_http::{HttpRequest, HttpResponse};

        struct Offline;
        impl Transport for Offline {
            fn send(&self, _: HttpRequest) -> BoxFuture<'_, stampede_http::Result<HttpResponse>> {
                Box::pin(async { Err(stampede_http::Error::Timeout(Duration::ZERO)) })
            }
        }

        let metrics = Arc::new(Registry::default());
        Self {
            client: RequestClient::new(Arc::new(Offline), metrics.clone(), None),
            metrics,
            stop: Arc::new(StopSignal::new()),
            think_time: ThinkTime::none(),
            iteration_timeout: None,
            live_vus: AtomicU64::new(0),
        }
    }
}

/// Stops a run from outside; the run drains and reports normally.
#[derive(Debug, Clone)]
pub struct RunHandle {
    stop: Arc<StopSignal>,
}

impl RunHandle {
    pub fn abort(&self) {
        self.stop.stop();
    }

    pub fn is_aborted(&self) -> bool {
        self.stop.is_stopped()
    }
}

/// A validated run, ready to drive a scenario.
pub struct Runner {
    schedule: Arc<RampSchedule>,
    thresholds: Arc<[Threshold]>,
    control_interval: Duration,
    ctx: Arc<RunContext>,
    progress: Option<ProgressFn>,
}

impl Runner {
    /// Validates `options` and parses thresholds; nothing is started yet.
    pub fn new(options: RunOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        options.validate()?;
        let thresholds = compile_thresholds(&options.thresholds)?;

        let metrics = Arc::new(Registry::default());
        let client = RequestClient::new(transport, metrics.clone(), options.request_timeout);

        Ok(Self {
            schedule: Arc::new(RampSchedule::new(options.start_vus, options.stages)),
            thresholds: thresholds.into(),
            control_interval: options.control_interval,
            ctx: Arc::new(RunContext {
                metrics,
                client,
                stop: Arc::new(StopSignal::new()),
                think_time: options.think_time,
                iteration_timeout: options.iteration_timeout,
                live_vus: AtomicU64::new(0),
            }),
            progress: None,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn handle(&self) -> RunHandle {
        RunHandle {
            stop: self.ctx.stop.clone(),
        }
    }

    pub fn metrics(&self) -> Arc<Registry> {
        self.ctx.metrics.clone()
    }

    pub fn schedule(&self) -> &RampSchedule {
        &self.schedule
    }

    /// Drives `scenario` through the schedule, then drains VUs and evaluates thresholds.
    pub async fn run<S: Scenario>(self, scenario: S) -> Result<RunResult> {
        let Self {
            schedule,
            thresholds,
            control_interval,
            ctx,
            progress,
        } = self;

        let clock = RunClock::start();
        let total = schedule.total_duration();
        let deadline = clock.at(total);
        tracing::info!(
            stages = schedule.stages().len(),
            total = ?total,
            peak_target = schedule.peak_target(),
            "run started"
        );

        let mut pool = WorkerPool::new(ctx.clone(), Arc::new(scenario));
        let mut ticker = ProgressTicker::new(progress);

        let mut interval = tokio::time::interval(control_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = tokio::time::sleep_until(deadline) => {}
                () = ctx.stop.wait() => {}
            }

            let elapsed = clock.elapsed();
            if ctx.stop.is_stopped() || schedule.is_done(elapsed) {
                break;
            }

            let desired = schedule.target_at(elapsed);
            pool.reconcile(desired);
            ticker.emit(&ctx.metrics, &schedule, elapsed, desired, pool.live());
        }

        let aborted = ctx.stop.is_stopped() && !schedule.is_done(clock.elapsed());
        if aborted {
            tracing::info!(elapsed = ?clock.elapsed(), "run aborted; draining vus");
        }

        ctx.stop.stop();
        let peak_vus = pool.peak();
        pool.shutdown().await?;

        let elapsed = clock.elapsed();
        let snapshot = ctx.metrics.snapshot();
        let outcomes = evaluate_thresholds(&snapshot, &thresholds);
        let passed = verdict(&outcomes);

        let result = RunResult {
            requests_total: snapshot.counter_or_zero(HTTP_REQS) as u64,
            iterations_total: snapshot.counter_or_zero(ITERATIONS) as u64,
            metrics: snapshot,
            thresholds: outcomes,
            passed,
            elapsed,
            peak_vus,
            aborted,
        };
        tracing::info!(
            elapsed = ?result.elapsed,
            iterations = result.iterations_total,
            requests = result.requests_total,
            peak_vus,
            passed,
            "run finished"
        );
        Ok(result)
    }
}

struct ProgressTicker {
    progress: Option<ProgressFn>,
    tick: u64,
    last_at: Option<Instant>,
    last_iterations: Option<CounterSnapshot>,
    last_requests: Option<CounterSnapshot>,
}

impl ProgressTicker {
    fn new(progress: Option<ProgressFn>) -> Self {
        Self {
            progress,
            tick: 0,
            last_at: None,
            last_iterations: None,
            last_requests: None,
        }
    }

    fn emit(
        &mut self,
        metrics: &Registry,
        schedule: &RampSchedule,
        elapsed: Duration,
        desired_vus: u64,
        live_vus: u64,
    ) {
        let Some(progress) = &self.progress else {
            return;
        };

        self.tick = self.tick.saturating_add(1);
        let now = Instant::now();
        let dt = self
            .last_at
            .map_or(elapsed, |last| now.duration_since(last))
            .as_secs_f64();
        self.last_at = Some(now);

        let iterations = CounterSnapshot::new(metrics.counter(ITERATIONS).unwrap_or(0.0));
        let requests = CounterSnapshot::new(metrics.counter(HTTP_REQS).unwrap_or(0.0));
        let live = LiveMetrics {
            iterations_total: iterations.total as u64,
            iterations_per_sec_now: iterations.per_sec_since(self.last_iterations, dt),
            requests_total: requests.total as u64,
            rps_now: requests.per_sec_since(self.last_requests, dt),
            failed_requests_total: metrics.rate(HTTP_REQ_FAILED).map_or(0, |r| r.hits),
            checks_failed_total: metrics
                .rate(crate::vu::CHECKS)
                .map_or(0, |r| r.misses()),
        };
        self.last_iterations = Some(iterations);
        self.last_requests = Some(requests);

        (progress)(ProgressUpdate {
            tick: self.tick,
            elapsed,
            total_duration: schedule.total_duration(),
            stage: schedule.stage_snapshot_at(elapsed),
            desired_vus,
            live_vus,
            metrics: live,
        });
    }
}
