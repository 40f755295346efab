//! Error types for the request executor, the authenticated client, token
//! storage, and configuration loading.
//!
//! # Design
//! `ApiError` is the only error a caller of `execute` or `request` ever sees.
//! The three transport outcomes (`Status`, `Network`, `Timeout`) are distinct
//! variants so callers can tell a server answer from an unreachable server.
//! `StorageError` never escapes the client: storage failures degrade to "no
//! stored token" and are only logged.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by `RequestExecutor` and `ApiClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status outside `[200, 300)`.
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    /// The transport could not complete the call at all.
    #[error("network error: {0}")]
    Network(String),

    /// No response arrived before the configured deadline.
    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("request has no url")]
    MissingUrl,

    #[error("request timeout must be greater than zero")]
    InvalidTimeout,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The server wrapped a failure `code` in an otherwise successful envelope.
    #[error("server rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },
}

impl ApiError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Failures of a [`TokenStore`](crate::storage::TokenStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read store '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store '{path}' is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode store contents: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
}

/// Failures surfaced by the `api-call` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_carries_code_and_text() {
        let err = ApiError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_network());
    }

    #[test]
    fn timeout_error_reports_deadline() {
        let err = ApiError::Timeout {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "request timed out after 1500ms");
        assert!(err.is_timeout());
        assert_eq!(err.status(), None);
    }
}
