//! Promise-style HTTP request executor and bearer-token API client.
//!
//! # Overview
//! `RequestExecutor` sends one request per call: options are merged over
//! fixed defaults, the call runs under a deadline, and the outcome resolves
//! to parsed JSON (or raw text) or to exactly one `ApiError`. `ApiClient`
//! layers a base URL and a bearer token on top.
//!
//! # Design
//! - The network sits behind the `Transport` trait; `ReqwestTransport` is the
//!   real one and tests script their own.
//! - The token is instance state on `ApiClient`, mirrored to a `TokenStore`
//!   so it survives restarts when a `FileStore` is used.
//! - No retries and no caching. Callers own any retry policy.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//! - The `api-call` binary (see [`cli`]) is a thin command-line front end.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod request;
pub mod response;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, CliError, ConfigError, StorageError};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{apply_defaults, Body, RequestConfig, RequestOptions};
pub use response::Response;
pub use storage::{FileStore, MemoryStore, TokenStore};
pub use transport::{ReqwestTransport, Transport, TransportFailure};
pub use types::{ApiEnvelope, LoginRequest, LoginResponse, PageEnvelope, PageInfo, UpdateUser, UserInfo};
