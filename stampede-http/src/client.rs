use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::{Duration, Instant};

use super::{Error, HttpRequest, HttpResponse, Result};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_USER_AGENT: &str = concat!("stampede/", env!("CARGO_PKG_VERSION"));

/// Pooled HTTP/1.1 client shared by every virtual user of a run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // An unreachable target should fail an iteration, not stall it for the OS connect timeout.
        Self::new(Some(DEFAULT_CONNECT_TIMEOUT))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        connector.set_connect_timeout(connect_timeout);
        connector.set_nodelay(true);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        Self {
            inner: Client::builder(TokioExecutor::new()).build(connector),
        }
    }

    /// Sends `req` and buffers the whole response body.
    ///
    /// Any status is a response; only failures to exchange a response are errors.
    /// `req.timeout` bounds the exchange including the body read.
    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let timeout = req.timeout;
        let req = build_request(req)?;

        let started = Instant::now();
        let exchange = async {
            let (parts, body) = self.inner.request(req).await?.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, body))
        };

        let (parts, body) = match timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => exchange.await?,
        };

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            body,
            headers: flatten_headers(&parts.headers),
            elapsed: started.elapsed(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }
}

fn build_request(req: HttpRequest) -> Result<Request<Full<Bytes>>> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
        ..
    } = req;

    match url::Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(_) => return Err(Error::UnsupportedScheme(url)),
        Err(_) => return Err(Error::InvalidUrl(url)),
    }
    let uri: hyper::Uri = url.parse().map_err(|_| Error::InvalidUrl(url.clone()))?;

    let mut builder = Request::builder().method(method).uri(uri);
    let mut has_user_agent = false;
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(&value).map_err(|_| Error::InvalidHeader(name))?;
        has_user_agent |= header == USER_AGENT;
        builder = builder.header(header, value);
    }
    if !has_user_agent {
        builder = builder.header(USER_AGENT, DEFAULT_USER_AGENT);
    }

    Ok(builder.body(Full::new(body))?)
}

/// Lowercase names in sorted order; repeated headers are joined with ", ".
fn flatten_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(", ");
        out.push((name.as_str().to_string(), joined));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}
