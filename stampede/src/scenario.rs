use bytes::Bytes;
use rand::Rng as _;
use rand::seq::SliceRandom as _;
use serde::Serialize;
use stampede_core::{HttpRequest, IterationContext, IterationOutcome, Scenario, ThinkTime};
use std::time::Duration;
use tokio::time::Instant;

pub const TICKETS_CREATED: &str = "tickets_created";
pub const TICKET_ERRORS: &str = "ticket_errors";
pub const RESPONSE_TIME: &str = "response_time";

pub const CHECK_STATUS: &str = "status is 201";
pub const CHECK_RESPONSE_TIME: &str = "response time < 10s";
pub const CHECK_TICKET_NUMBER: &str = "has ticket number";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const QUEUE_TYPES: [&str; 4] = ["CAJA", "PERSONAL", "EMPRESAS", "GERENCIA"];
const SLOW_RESPONSE: Duration = Duration::from_secs(10);
const CROWDED_VUS: u64 = 30;
const BODY_PREVIEW_BYTES: usize = 100;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TicketRequest {
    pub national_id: String,
    pub telefono: String,
    pub branch_office: String,
    pub queue_type: String,
}

impl TicketRequest {
    pub(crate) fn random() -> Self {
        let mut rng = rand::thread_rng();
        let queue = QUEUE_TYPES.choose(&mut rng).copied().unwrap_or(QUEUE_TYPES[0]);
        Self {
            national_id: format!("STRESS{}", rng.gen_range(100_000..1_000_000)),
            telefono: "+56912345678".to_string(),
            branch_office: "Sucursal Stress".to_string(),
            queue_type: queue.to_string(),
        }
    }
}

/// Pause between ticket iterations; shorter once the run is crowded.
pub(crate) fn ticket_think_time() -> ThinkTime {
    ThinkTime::from_fn(|live_vus| {
        let jitter = if live_vus > CROWDED_VUS {
            Duration::from_millis(500)
        } else {
            Duration::from_secs(1)
        };
        Duration::from_millis(500) + stampede_core::uniform_jitter(jitter)
    })
}

/// Creates one ticket per iteration and records the ticket metrics.
#[derive(Debug, Clone)]
pub(crate) struct TicketScenario {
    url: String,
    timeout: Duration,
}

impl TicketScenario {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            url: format!("{}/api/tickets", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    async fn create_ticket(&self, ctx: IterationContext) -> anyhow::Result<IterationOutcome> {
        let body = serde_json::to_vec(&TicketRequest::random())?;
        let req = HttpRequest::post(&self.url, Bytes::from(body))
            .header("Content-Type", "application/json")
            .timeout(self.timeout);

        let started = Instant::now();
        let res = ctx.client().request(req).await;
        // Failed exchanges count too, so slow timeouts show up in the trend.
        let latency = match &res {
            Ok(resp) => resp.elapsed,
            Err(_) => started.elapsed(),
        };
        ctx.metrics()
            .add_trend(RESPONSE_TIME, latency.as_secs_f64() * 1000.0)?;

        let outcome = match res {
            Ok(resp) => {
                let created = ctx.check(CHECK_STATUS, resp.status == 201);
                let fast = ctx.check(CHECK_RESPONSE_TIME, resp.elapsed < SLOW_RESPONSE);
                let numbered = ctx.check(CHECK_TICKET_NUMBER, has_ticket_number(&resp.body));

                let outcome = if created && fast && numbered {
                    IterationOutcome::success()
                } else {
                    let preview = &resp.body[..resp.body.len().min(BODY_PREVIEW_BYTES)];
                    let preview = String::from_utf8_lossy(preview);
                    tracing::warn!(
                        vu = ctx.vu_id(),
                        status = resp.status,
                        body = %preview,
                        "ticket creation failed"
                    );
                    IterationOutcome::failed(format!("status {}", resp.status))
                };
                outcome.with_status(resp.status).with_latency(resp.elapsed)
            }
            Err(err) => {
                for check in [CHECK_STATUS, CHECK_RESPONSE_TIME, CHECK_TICKET_NUMBER] {
                    ctx.check(check, false);
                }
                tracing::warn!(vu = ctx.vu_id(), error = %err, "ticket request failed");
                IterationOutcome::failed(err.to_string()).with_latency(latency)
            }
        };

        if outcome.success {
            ctx.metrics().add_counter(TICKETS_CREATED, 1.0)?;
        }
        ctx.metrics().add_rate(TICKET_ERRORS, !outcome.success)?;

        Ok(outcome)
    }
}

impl Scenario for TicketScenario {
    type Error = anyhow::Error;

    fn iteration(
        &self,
        ctx: IterationContext,
    ) -> impl Future<Output = Result<IterationOutcome, Self::Error>> + Send {
        self.create_ticket(ctx)
    }
}

fn has_ticket_number(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("numero").cloned())
        .is_some_and(|n| !n.is_null())
}
