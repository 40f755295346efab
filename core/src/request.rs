//! Per-call request options and the defaulting step that turns them into a
//! complete `RequestConfig`.
//!
//! # Design
//! `RequestOptions` has one optional field per setting. `apply_defaults` is
//! the only place defaults are filled in: a field the caller set always wins,
//! a field the caller left empty takes the default, and a url is never
//! invented. Headers merge key by key (ignoring case), so overriding
//! `Content-Type` keeps the `X-Requested-With` marker.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{find_header, set_header, HttpMethod, HttpRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const CONTENT_TYPE: &str = "Content-Type";
pub const REQUESTED_WITH: &str = "X-Requested-With";
pub const AUTHORIZATION: &str = "Authorization";

/// Baseline headers every request starts from.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        (CONTENT_TYPE.to_owned(), "application/json".to_owned()),
        (REQUESTED_WITH.to_owned(), "XMLHttpRequest".to_owned()),
    ]
}

/// Request payload before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Structured data. Objects and arrays are serialized; a JSON string is
    /// sent as its raw contents.
    Json(Value),
    /// Sent verbatim.
    Text(String),
}

impl Body {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// Wire form of the payload. `None` means no body is sent.
    pub fn encode(&self) -> Result<Option<String>, ApiError> {
        match self {
            Body::Text(text) | Body::Json(Value::String(text)) if text.is_empty() => Ok(None),
            Body::Text(text) | Body::Json(Value::String(text)) => Ok(Some(text.clone())),
            Body::Json(Value::Null) => Ok(None),
            Body::Json(Value::Bool(flag)) => Ok(Some(flag.to_string())),
            Body::Json(Value::Number(number)) => Ok(Some(number.to_string())),
            Body::Json(value) => serde_json::to_string(value)
                .map(Some)
                .map_err(|e| ApiError::Serialization(e.to_string())),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

/// Caller-supplied settings for one request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Adds a header, replacing an earlier one with the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A request with every default applied and the body already encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl RequestConfig {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn into_http_request(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        }
    }
}

/// Merge `options` over the defaults: `GET`, [`default_headers`], and
/// [`DEFAULT_TIMEOUT`].
pub fn apply_defaults(options: RequestOptions) -> Result<RequestConfig, ApiError> {
    let url = options.url.ok_or(ApiError::MissingUrl)?;
    let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
    if timeout.is_zero() {
        return Err(ApiError::InvalidTimeout);
    }

    let mut headers = default_headers();
    for (name, value) in options.headers {
        set_header(&mut headers, &name, value);
    }

    let body = match &options.body {
        Some(body) => body.encode()?,
        None => None,
    };

    Ok(RequestConfig {
        method: options.method.unwrap_or_default(),
        url,
        headers,
        body,
        timeout,
    })
}
