use futures::future::BoxFuture;
use stampede_http::{HttpClient, HttpRequest, HttpResponse};
use stampede_metrics::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::iteration_metrics::duration_ms;

pub const HTTP_REQS: &str = "http_reqs";
/// Request latency in milliseconds.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";

/// The send-one-request primitive VUs drive.
pub trait Transport: Send + Sync {
    fn send(&self, req: HttpRequest) -> BoxFuture<'_, stampede_http::Result<HttpResponse>>;
}

impl Transport for HttpClient {
    fn send(&self, req: HttpRequest) -> BoxFuture<'_, stampede_http::Result<HttpResponse>> {
        Box::pin(self.request(req))
    }
}

/// Transport wrapper that records the built-in request metrics.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    metrics: Arc<Registry>,
    default_timeout: Option<Duration>,
}

impl RequestClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        metrics: Arc<Registry>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            metrics,
            default_timeout,
        }
    }

    /// Sends `req`; a status >= 400 is returned as a response, not an error.
    ///
    /// The response's `elapsed` is replaced by the latency recorded in `http_req_duration`.
    pub async fn request(&self, mut req: HttpRequest) -> stampede_http::Result<HttpResponse> {
        if req.timeout.is_none() {
            req.timeout = self.default_timeout;
        }

        let started = Instant::now();
        let res = self.transport.send(req).await;
        let elapsed = started.elapsed();

        match res {
            Ok(mut resp) => {
                resp.elapsed = elapsed;
                self.record(Some(elapsed), resp.status >= 400);
                Ok(resp)
            }
            Err(err) => {
                tracing::debug!(error = %err, kind = %err.transport_error_kind(), "request failed");
                self.record(None, true);
                Err(err)
            }
        }
    }

    pub async fn get(&self, url: &str) -> stampede_http::Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    fn record(&self, latency: Option<Duration>, failed: bool) {
        let mut res = self.metrics.add_counter(HTTP_REQS, 1.0);
        if let Some(latency) = latency {
            res = res.and_then(|()| self.metrics.add_trend(HTTP_REQ_DURATION, duration_ms(latency)));
        }
        res = res.and_then(|()| self.metrics.add_rate(HTTP_REQ_FAILED, failed));

        if let Err(err) = res {
            tracing::warn!(error = %err, "failed to record request metrics");
        }
    }
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
