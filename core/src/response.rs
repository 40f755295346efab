//! The value a successful request resolves to.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Body of a 2xx response: parsed JSON when the body is well-formed,
/// otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(Value),
    Text(String),
}

impl Response {
    /// Never fails: unparseable bodies (including empty ones) become `Text`.
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => Response::Json(value),
            Err(_) => Response::Text(body),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Response::Json(value) => Some(value),
            Response::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Json(_) => None,
        }
    }

    /// Deserialize into `T`. A `Text` response is tried as JSON as well, so
    /// a bare JSON string target still works.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let parsed = match self {
            Response::Json(value) => serde_json::from_value(value),
            Response::Text(text) => serde_json::from_value(Value::String(text)),
        };
        parsed.map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}
