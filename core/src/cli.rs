//! Command-line front end for `ApiClient`, used by the `api-call` binary.
//!
//! # Design
//! Argument parsing and the request flow live here so they can be tested
//! against a scripted transport; `src/bin/api-call.rs` only wires stdout,
//! stderr, and the exit code. Settings come from an optional TOML file with
//! `API_BASE_URL` / `API_TIMEOUT_MS` applied on top.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, CliError, ConfigError};
use crate::http::HttpMethod;
use crate::logging::init_logging;
use crate::request::{Body, RequestOptions};
use crate::response::Response;
use crate::storage::{FileStore, MemoryStore, TokenStore};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::LoginRequest;

#[derive(Debug, Parser, Clone)]
#[command(name = "api-call", version, about = "Send one request through the authenticated API client")]
pub struct CliArgs {
    /// Endpoint path (appended to the base URL) or absolute URL
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// Request body; sent as JSON when it parses as JSON, otherwise as text
    #[arg(long, short)]
    pub data: Option<String>,

    /// Extra header as `Name: value` (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// TOML config file
    #[arg(long, short, env = "API_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log in with `username:password` before sending
    #[arg(long, value_parser = parse_credentials)]
    pub login: Option<LoginRequest>,

    /// Forget the token once the request has finished
    #[arg(long)]
    pub logout: bool,

    /// Deadline for this request in milliseconds
    #[arg(long = "timeout-ms", value_parser = parse_positive_u64)]
    pub timeout_ms: Option<u64>,

    /// Debug-level logging unless `API_LOG` or `RUST_LOG` is set
    #[arg(long, short)]
    pub verbose: bool,
}

fn parse_method(raw: &str) -> Result<HttpMethod, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_owned());
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn parse_credentials(raw: &str) -> Result<LoginRequest, String> {
    match raw.split_once(':') {
        Some((username, password)) if !username.is_empty() => Ok(LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        }),
        _ => Err("expected 'username:password'".to_owned()),
    }
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".to_owned()),
        Ok(value) => Ok(value),
        Err(err) => Err(err.to_string()),
    }
}

/// `--data` as JSON when it parses, verbatim text otherwise.
fn request_body(raw: &str) -> Body {
    serde_json::from_str::<Value>(raw).map_or_else(|_| Body::from(raw), Body::from)
}

/// Read the config file (defaults when absent), then apply the environment.
///
/// # Errors
///
/// Unreadable or invalid config, or a malformed environment override.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    config.with_env_overrides()
}

/// Optional login, the request itself, then optional logout.
///
/// Logout runs whether or not the request succeeded.
///
/// # Errors
///
/// The login or request failure, unchanged.
pub async fn send<T: Transport, S: TokenStore>(
    client: &ApiClient<T, S>,
    args: &CliArgs,
) -> Result<Response, ApiError> {
    if let Some(credentials) = &args.login {
        client.login(credentials).await?;
    }

    let mut options = RequestOptions::new().method(args.method);
    for (name, value) in &args.headers {
        options = options.header(name, value.as_str());
    }
    if let Some(data) = &args.data {
        options = options.body(request_body(data));
    }
    if let Some(ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(ms));
    }

    let result = client.request(&args.endpoint, options).await;
    if args.logout {
        client.logout();
    }
    result
}

/// Entry point of the binary: config, logging, client, then [`send`].
///
/// # Errors
///
/// Configuration failures, or whatever [`send`] returns.
pub async fn run(args: CliArgs) -> Result<Response, CliError> {
    let config = load_config(args.config.as_deref())?;
    init_logging(config.log_filter.as_deref(), args.verbose);

    let store: Arc<dyn TokenStore> = match &config.token_file {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    debug!(base_url = %config.base_url, persisted = config.token_file.is_some(), "client configured");
    let client = ApiClient::from_config(&config, ReqwestTransport::new(), store);
    Ok(send(&client, &args).await?)
}

/// Pretty-printed JSON, or the text body as-is.
pub fn render(response: &Response) -> String {
    match response {
        Response::Json(value) => format!("{value:#}"),
        Response::Text(text) => text.clone(),
    }
}
