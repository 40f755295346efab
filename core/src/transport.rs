//! The network boundary.
//!
//! # Design
//! A `Transport` turns one `HttpRequest` into exactly one tagged outcome:
//! a completed `HttpResponse` (any status), a network failure, or a
//! transport-side timeout. Status interpretation and JSON parsing stay in the
//! executor, so a transport never needs to know what "success" means.
//!
//! `ReqwestTransport` is the production implementation. Tests implement the
//! trait directly with scripted responses.

use async_trait::async_trait;
use tracing::trace;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Why a transport could not produce an `HttpResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection refused, DNS failure, malformed URL, broken body stream.
    Network(String),
    /// The transport gave up waiting on its own deadline.
    Timeout,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// `Transport` backed by a shared `reqwest::Client`.
///
/// 4xx/5xx responses come back as `Ok` so the executor can map them.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response.text().await.map_err(classify)?;
        trace!(status = status.as_u16(), bytes = body.len(), "response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        })
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Network(err.to_string())
    }
}
