//! Authenticated API client.
//!
//! # Design
//! `ApiClient` wraps a `RequestExecutor` with two concerns: endpoint paths
//! are prefixed with `base_url` unless already absolute, and a bearer token
//! is attached when one is known. The token lives on the instance, behind a
//! lock, with a persisted copy in a `TokenStore`:
//!
//! - the in-memory cache answers every read once it has been set;
//! - the store is consulted only while the cache has never been set;
//! - `set_token` writes both, and clearing removes both.
//!
//! Failures from the executor are logged and returned unchanged.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{ClientConfig, DEFAULT_TOKEN_KEY};
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::http::{set_header, HttpMethod};
use crate::request::{Body, RequestOptions, AUTHORIZATION};
use crate::response::Response;
use crate::storage::TokenStore;
use crate::transport::Transport;
use crate::types::{ApiEnvelope, LoginRequest, LoginResponse};

pub const LOGIN_PATH: &str = "/auth/login";

/// State of the in-memory token cache.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedToken {
    /// Never set; reads fall through to the store.
    Unloaded,
    /// Explicitly cleared; reads return `None` without touching the store.
    Cleared,
    Present(String),
}

pub struct ApiClient<T, S> {
    executor: RequestExecutor<T>,
    store: S,
    base_url: String,
    token_key: String,
    timeout: Option<Duration>,
    token: RwLock<CachedToken>,
}

/// The token itself is never printed, only whether one is cached.
impl<T: fmt::Debug, S: fmt::Debug> fmt::Debug for ApiClient<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match &*self.token.read().unwrap_or_else(PoisonError::into_inner) {
            CachedToken::Unloaded => "unloaded",
            CachedToken::Cleared => "cleared",
            CachedToken::Present(_) => "present",
        };
        f.debug_struct("ApiClient")
            .field("executor", &self.executor)
            .field("store", &self.store)
            .field("base_url", &self.base_url)
            .field("token_key", &self.token_key)
            .field("timeout", &self.timeout)
            .field("token", &token)
            .finish()
    }
}

impl<T: Transport, S: TokenStore> ApiClient<T, S> {
    pub fn new(transport: T, store: S, base_url: &str) -> Self {
        Self {
            executor: RequestExecutor::new(transport),
            store,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
            timeout: None,
            token: RwLock::new(CachedToken::Unloaded),
        }
    }

    pub fn from_config(config: &ClientConfig, transport: T, store: S) -> Self {
        let mut client = Self::new(transport, store, &config.base_url);
        client.token_key.clone_from(&config.token_key);
        client.timeout = Some(config.timeout());
        client
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is appended to `base_url`.
    ///
    /// Absolute means a scheme and a host. `localhost:3000/x` parses with
    /// `localhost` as its scheme but has no host, so it is treated as a path.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if Url::parse(endpoint).is_ok_and(|url| url.has_host()) {
            endpoint.to_owned()
        } else {
            format!("{}{endpoint}", self.base_url)
        }
    }

    /// The current token, loading it from the store on first use.
    pub fn token(&self) -> Option<String> {
        {
            let cached = self.token.read().unwrap_or_else(PoisonError::into_inner);
            match &*cached {
                CachedToken::Present(token) => return Some(token.clone()),
                CachedToken::Cleared => return None,
                CachedToken::Unloaded => {}
            }
        }

        let stored = self.load_stored_token()?;
        let mut cached = self.token.write().unwrap_or_else(PoisonError::into_inner);
        match &*cached {
            CachedToken::Unloaded => {
                *cached = CachedToken::Present(stored.clone());
                Some(stored)
            }
            // A concurrent `set_token` won the race.
            CachedToken::Present(token) => Some(token.clone()),
            CachedToken::Cleared => None,
        }
    }

    /// Replace the token. `None` or an empty string clears it everywhere.
    pub fn set_token(&self, token: Option<&str>) {
        let mut cached = self.token.write().unwrap_or_else(PoisonError::into_inner);
        match token.filter(|token| !token.is_empty()) {
            Some(token) => {
                *cached = CachedToken::Present(token.to_owned());
                let encoded = Value::String(token.to_owned()).to_string();
                if let Err(err) = self.store.set(&self.token_key, &encoded) {
                    warn!(key = %self.token_key, error = %err, "failed to persist auth token");
                }
            }
            None => {
                *cached = CachedToken::Cleared;
                if let Err(err) = self.store.remove(&self.token_key) {
                    warn!(key = %self.token_key, error = %err, "failed to remove persisted auth token");
                }
            }
        }
    }

    pub fn clear_token(&self) {
        self.set_token(None);
    }

    fn load_stored_token(&self) -> Option<String> {
        let raw = match self.store.get(&self.token_key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key = %self.token_key, error = %err, "failed to read persisted auth token");
                return None;
            }
        };
        match serde_json::from_str::<Option<String>>(&raw) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(key = %self.token_key, error = %err, "ignoring malformed persisted auth token");
                None
            }
        }
    }

    /// Send a request to `endpoint` with the bearer token attached.
    ///
    /// # Errors
    ///
    /// Any `ApiError` from the executor, unchanged.
    pub async fn request(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
    ) -> Result<Response, ApiError> {
        if let Some(token) = self.token() {
            set_header(&mut options.headers, AUTHORIZATION, format!("Bearer {token}"));
        }
        if options.timeout.is_none() {
            options.timeout = self.timeout;
        }
        options.url = Some(self.resolve_url(endpoint));

        self.executor.execute(options).await.inspect_err(|err| {
            error!(endpoint, error = %err, "API request failed");
        })
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.request(endpoint, options.method(HttpMethod::Get)).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        data: impl Into<Body>,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        self.request(endpoint, options.method(HttpMethod::Post).body(data))
            .await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        data: impl Into<Body>,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        self.request(endpoint, options.method(HttpMethod::Put).body(data))
            .await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        self.request(endpoint, options.method(HttpMethod::Delete))
            .await
    }

    /// Post credentials to the login endpoint and keep the issued token.
    ///
    /// # Errors
    ///
    /// Transport errors, `Rejected` when the server refuses the credentials,
    /// or `Deserialization` when the reply has no usable payload.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let envelope: ApiEnvelope<LoginResponse> = self
            .post(LOGIN_PATH, Body::json(credentials)?, RequestOptions::new())
            .await?
            .into_json()?;
        let login = envelope
            .into_data()?
            .ok_or_else(|| ApiError::Deserialization("login reply carried no data".to_owned()))?;
        self.set_token(Some(&login.token));
        info!(username = %credentials.username, expires_at = %login.expires_at, "logged in");
        Ok(login)
    }

    pub fn logout(&self) {
        self.clear_token();
        info!("logged out");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::StorageError;
    use crate::executor::tests::ScriptedTransport;
    use crate::storage::MemoryStore;

    fn client_with(
        transport: ScriptedTransport,
    ) -> (ApiClient<ScriptedTransport, Arc<MemoryStore>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ApiClient::new(transport, Arc::clone(&store), "/api"), store)
    }

    fn ok_client() -> (ApiClient<ScriptedTransport, Arc<MemoryStore>>, Arc<MemoryStore>) {
        client_with(ScriptedTransport::replying(200, "OK", r#"{"code":200}"#))
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl TokenStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Read {
                path: "broken".into(),
                source: std::io::Error::other("disk unavailable"),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Write {
                path: "broken".into(),
                source: std::io::Error::other("disk unavailable"),
            })
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.set(key, "")
        }
    }

    #[test]
    fn relative_paths_get_base_url() {
        let (client, _) = ok_client();
        assert_eq!(client.resolve_url("/users"), "/api/users");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let (client, _) = ok_client();
        assert_eq!(
            client.resolve_url("https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn scheme_without_host_is_a_path() {
        let (client, _) = ok_client();
        assert_eq!(client.resolve_url("localhost:3000/x"), "/apilocalhost:3000/x");
        assert_eq!(client.resolve_url("users:42"), "/apiusers:42");
        assert_eq!(
            client.resolve_url("http://localhost:3000/x"),
            "http://localhost:3000/x"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let client = ApiClient::new(
            crate::transport::ReqwestTransport::new(),
            MemoryStore::new(),
            "http://localhost:8080/api",
        );
        client.set_token(Some("s3cret-token"));

        let printed = format!("{client:?}");
        assert!(printed.contains("ApiClient"));
        assert!(printed.contains("http://localhost:8080/api"));
        assert!(printed.contains("present"));
        assert!(!printed.contains("s3cret-token"));
    }

    #[test]
    fn trailing_slash_on_base_is_stripped() {
        let client = ApiClient::new(
            ScriptedTransport::replying(200, "OK", ""),
            MemoryStore::new(),
            "http://localhost:8080/api/",
        );
        assert_eq!(client.resolve_url("/users"), "http://localhost:8080/api/users");
    }

    #[test]
    fn set_then_read_returns_same_token() {
        let (client, store) = ok_client();
        client.set_token(Some("abc"));
        assert_eq!(client.token().as_deref(), Some("abc"));
        assert_eq!(store.get(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("\"abc\""));
    }

    #[test]
    fn clearing_removes_both_copies() {
        let (client, store) = ok_client();
        client.set_token(Some("abc"));
        client.clear_token();
        assert_eq!(client.token(), None);
        assert_eq!(store.get(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn empty_token_clears() {
        let (client, store) = ok_client();
        client.set_token(Some("abc"));
        client.set_token(Some(""));
        assert_eq!(client.token(), None);
        assert_eq!(store.get(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn unset_cache_reads_persisted_token_once() {
        let (client, store) = ok_client();
        store.set(DEFAULT_TOKEN_KEY, "\"from-disk\"").unwrap();
        assert_eq!(client.token().as_deref(), Some("from-disk"));

        // Cached now: later store changes are invisible.
        store.set(DEFAULT_TOKEN_KEY, "\"changed\"").unwrap();
        assert_eq!(client.token().as_deref(), Some("from-disk"));
    }

    #[test]
    fn cleared_cache_does_not_consult_store() {
        let (client, store) = ok_client();
        client.clear_token();
        store.set(DEFAULT_TOKEN_KEY, "\"stale\"").unwrap();
        assert_eq!(client.token(), None);
    }

    #[test]
    fn malformed_persisted_token_reads_as_absent() {
        let (client, store) = ok_client();
        store.set(DEFAULT_TOKEN_KEY, "abc").unwrap();
        assert_eq!(client.token(), None);
    }

    #[test]
    fn storage_failures_degrade_to_no_token() {
        let client = ApiClient::new(
            ScriptedTransport::replying(200, "OK", ""),
            BrokenStore,
            "/api",
        );
        assert_eq!(client.token(), None);
        client.set_token(Some("abc"));
        assert_eq!(client.token().as_deref(), Some("abc"));
        client.clear_token();
        assert_eq!(client.token(), None);
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer_header() {
        let (client, _) = ok_client();
        client.set_token(Some("abc"));
        client
            .get("/users", RequestOptions::new().header("X-Trace", "t-9"))
            .await
            .unwrap();

        let sent = client.executor().transport().last_request();
        assert_eq!(sent.url, "/api/users");
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.header(AUTHORIZATION), Some("Bearer abc"));
        assert_eq!(sent.header("X-Trace"), Some("t-9"));
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn no_token_means_no_authorization_header() {
        let (client, _) = ok_client();
        client.get("/hello", RequestOptions::new()).await.unwrap();
        let sent = client.executor().transport().last_request();
        assert_eq!(sent.header(AUTHORIZATION), None);
    }

    #[tokio::test]
    async fn endpoint_overrides_option_url() {
        let (client, _) = ok_client();
        client
            .delete("/users/5", RequestOptions::new().url("/elsewhere"))
            .await
            .unwrap();
        let sent = client.executor().transport().last_request();
        assert_eq!(sent.url, "/api/users/5");
        assert_eq!(sent.method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn post_forwards_data_as_body() {
        let (client, _) = ok_client();
        client
            .post("/form", json!({"name": "iris"}), RequestOptions::new())
            .await
            .unwrap();
        let sent = client.executor().transport().last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.body.as_deref(), Some(r#"{"name":"iris"}"#));
    }

    #[tokio::test]
    async fn configured_timeout_applies_when_caller_sets_none() {
        let config = ClientConfig {
            timeout_ms: 1200,
            ..ClientConfig::default()
        };
        let client = ApiClient::from_config(
            &config,
            ScriptedTransport::replying(200, "OK", ""),
            MemoryStore::new(),
        );
        client.get("/hello", RequestOptions::new()).await.unwrap();
        assert_eq!(
            client.executor().transport().last_request().timeout,
            Duration::from_millis(1200)
        );

        let options = RequestOptions::new().timeout(Duration::from_millis(80));
        client.get("/hello", options).await.unwrap();
        assert_eq!(
            client.executor().transport().last_request().timeout,
            Duration::from_millis(80)
        );
    }

    #[tokio::test]
    async fn executor_errors_propagate_unchanged() {
        let (client, _) = client_with(ScriptedTransport::replying(500, "Internal Server Error", ""));
        let err = client.get("/users", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status { status: 500, ref status_text } if status_text == "Internal Server Error"
        ));
    }

    #[tokio::test]
    async fn login_stores_issued_token() {
        let reply = json!({
            "code": 200,
            "message": "ok",
            "data": {
                "token": "tok-1",
                "expires_at": "2026-10-16T00:00:00Z",
                "user": null
            }
        });
        let (client, store) =
            client_with(ScriptedTransport::replying(200, "OK", &reply.to_string()));
        let login = client
            .login(&LoginRequest {
                username: "admin".to_string(),
                password: "admin123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(login.token, "tok-1");
        assert_eq!(client.token().as_deref(), Some("tok-1"));
        assert_eq!(store.get(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("\"tok-1\""));
        let sent = client.executor().transport().last_request();
        assert_eq!(sent.url, "/api/auth/login");
        assert_eq!(sent.header(AUTHORIZATION), None);

        client.logout();
        assert_eq!(client.token(), None);
    }

    #[tokio::test]
    async fn rejected_login_keeps_token_unset() {
        let (client, _) = client_with(ScriptedTransport::replying(
            200,
            "OK",
            r#"{"code":401,"message":"bad credentials"}"#,
        ));
        let err = client
            .login(&LoginRequest {
                username: "admin".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { code: 401, .. }));
        assert_eq!(client.token(), None);
    }

    #[test]
    fn token_persists_over_corrupt_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"auth_token": "\"ab"#).unwrap();

        let client = ApiClient::new(
            ScriptedTransport::replying(200, "OK", ""),
            crate::storage::FileStore::new(&path),
            "/api",
        );
        assert_eq!(client.token(), None);
        client.set_token(Some("fresh"));

        let restarted = ApiClient::new(
            ScriptedTransport::replying(200, "OK", ""),
            crate::storage::FileStore::new(&path),
            "/api",
        );
        assert_eq!(restarted.token().as_deref(), Some("fresh"));
    }
}
