use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_SLOW: &str = "/slow";
/// How long [`PATH_SLOW`] waits before answering.
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_millis(50);
pub const PATH_STATUS: &str = "/status/{code}";
pub const PATH_TICKETS: &str = "/api/tickets";
/// Prefix under which the ticket API always answers 503.
pub const PATH_BROKEN_PREFIX: &str = "/broken";

const QUEUE_TYPES: [&str; 4] = ["CAJA", "PERSONAL", "EMPRESAS", "GERENCIA"];

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    tickets_created: Arc<AtomicU64>,
    tickets_rejected: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn next_ticket(&self) -> u64 {
        self.tickets_created.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn inc_tickets_rejected(&self) {
        self.tickets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn tickets_created(&self) -> u64 {
        self.tickets_created.load(Ordering::Relaxed)
    }

    pub fn tickets_rejected(&self) -> u64 {
        self.tickets_rejected.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    /// Base URL whose ticket API always fails.
    pub broken_base_url: String,
    pub hello: String,
    pub slow: String,
    pub tickets: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            broken_base_url: format!("{base_url}{PATH_BROKEN_PREFIX}"),
            hello: format!("{base_url}{PATH_HELLO}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            tickets: format!("{base_url}{PATH_TICKETS}"),
            base_url,
        }
    }

    pub fn status(&self, code: u16) -> String {
        format!("{}/status/{code}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTicketRequest {
    national_id: String,
    telefono: String,
    branch_office: String,
    queue_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketResponse {
    numero: String,
    national_id: String,
    branch_office: String,
    queue_type: String,
}

async fn handle_create_ticket(State(stats): State<TestServerStats>, body: Bytes) -> (StatusCode, Bytes) {
    stats.inc_requests_total();

    let req: CreateTicketRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            stats.inc_tickets_rejected();
            return (StatusCode::BAD_REQUEST, Bytes::from_static(b"bad json"));
        }
    };

    if req.national_id.is_empty()
        || req.telefono.is_empty()
        || !QUEUE_TYPES.contains(&req.queue_type.as_str())
    {
        stats.inc_tickets_rejected();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Bytes::from_static(b"invalid ticket request"),
        );
    }

    let prefix = req.queue_type.chars().next().unwrap_or('T');
    let res = TicketResponse {
        numero: format!("{prefix}{:03}", stats.next_ticket()),
        national_id: req.national_id,
        branch_office: req.branch_office,
        queue_type: req.queue_type,
    };

    match serde_json::to_vec(&res) {
        Ok(bytes) => (StatusCode::CREATED, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ),
    }
}

async fn handle_broken_ticket(State(stats): State<TestServerStats>) -> (StatusCode, &'static str) {
    stats.inc_requests_total();
    stats.inc_tickets_rejected();
    (StatusCode::SERVICE_UNAVAILABLE, "ticket service unavailable")
}

async fn handle_hello(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    "Hello World!"
}

async fn handle_slow(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    sleep(SLOW_RESPONSE_DELAY).await;
    "slow"
}

async fn handle_status(State(stats): State<TestServerStats>, Path(code): Path<u16>) -> StatusCode {
    stats.inc_requests_total();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_STATUS, get(handle_status))
        .route(PATH_TICKETS, post(handle_create_ticket))
        .route(
            &format!("{PATH_BROKEN_PREFIX}{PATH_TICKETS}"),
            post(handle_broken_ticket),
        )
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            urls: TestServerUrls::new(format!("http://{addr}")),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.urls.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_body(queue: &str) -> Bytes {
        Bytes::from(format!(
            r#"{{"nationalId":"STRESS123456","telefono":"+56912345678","branchOffice":"Sucursal Stress","queueType":"{queue}"}}"#
        ))
    }

    #[tokio::test]
    async fn valid_ticket_is_created_with_a_number() {
        let stats = TestServerStats::default();

        let (status, body) = handle_create_ticket(State(stats.clone()), ticket_body("CAJA")).await;
        assert_eq!(status, StatusCode::CREATED);

        let v: serde_json::Value =
            serde_json::from_slice(&body).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(v["numero"], "C001");
        assert_eq!(v["queueType"], "CAJA");
        assert_eq!(stats.tickets_created(), 1);
        assert_eq!(stats.requests_total(), 1);
    }

    #[tokio::test]
    async fn unknown_queue_and_bad_json_are_rejected() {
        let stats = TestServerStats::default();

        let (status, _) = handle_create_ticket(State(stats.clone()), ticket_body("VIP")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) =
            handle_create_ticket(State(stats.clone()), Bytes::from_static(b"{")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(stats.tickets_rejected(), 2);
        assert_eq!(stats.tickets_created(), 0);
    }

    #[test]
    fn urls_are_derived_from_the_base() {
        let urls = TestServerUrls::new("http://127.0.0.1:9".to_string());
        assert_eq!(urls.tickets, "http://127.0.0.1:9/api/tickets");
        assert_eq!(urls.broken_base_url, "http://127.0.0.1:9/broken");
        assert_eq!(urls.status(500), "http://127.0.0.1:9/status/500");
    }
}
