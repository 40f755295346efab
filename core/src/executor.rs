//! Single-shot request execution.
//!
//! # Design
//! `RequestExecutor` owns a transport and nothing else. `execute` applies
//! defaults, sends exactly one request under a `tokio::time::timeout`
//! deadline, and settles the outcome into `Ok(Response)` or one `ApiError`.
//! When the deadline fires the in-flight transport future is dropped; its
//! result can never reach the caller.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::request::{apply_defaults, Body, RequestOptions};
use crate::response::Response;
use crate::transport::{Transport, TransportFailure};

#[derive(Debug, Clone)]
pub struct RequestExecutor<T> {
    transport: T,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request built from `options` merged over the defaults.
    ///
    /// # Errors
    ///
    /// `Status` for a non-2xx answer, `Network` when the transport could not
    /// complete the call, `Timeout` when the deadline passed first, and
    /// `MissingUrl`/`InvalidTimeout`/`Serialization` when `options` cannot
    /// be turned into a request.
    pub async fn execute(&self, options: RequestOptions) -> Result<Response, ApiError> {
        let config = apply_defaults(options)?;
        let method = config.method;
        let url = config.url.clone();
        let deadline = config.timeout;
        debug!(%method, %url, timeout_ms = deadline.as_millis() as u64, "dispatching request");

        let outcome = tokio::time::timeout(deadline, self.transport.send(config.into_http_request()))
            .await
            .unwrap_or(Err(TransportFailure::Timeout));

        let settled = settle(outcome, deadline);
        match &settled {
            Ok(_) => debug!(%method, %url, "request succeeded"),
            Err(err) => debug!(%method, %url, error = %err, "request failed"),
        }
        settled
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.execute(options.method(HttpMethod::Get).url(url)).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<Body>,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        self.execute(options.method(HttpMethod::Post).url(url).body(body))
            .await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<Body>,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        self.execute(options.method(HttpMethod::Put).url(url).body(body))
            .await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.execute(options.method(HttpMethod::Delete).url(url)).await
    }
}

/// Map a transport outcome to the caller-visible result.
fn settle(
    outcome: Result<HttpResponse, TransportFailure>,
    deadline: Duration,
) -> Result<Response, ApiError> {
    match outcome {
        Ok(response) if response.is_success() => Ok(Response::from_body(response.body)),
        Ok(response) => Err(ApiError::Status {
            status: response.status,
            status_text: response.status_text,
        }),
        Err(TransportFailure::Network(reason)) => Err(ApiError::Network(reason)),
        Err(TransportFailure::Timeout) => Err(ApiError::Timeout { after: deadline }),
    }
}
