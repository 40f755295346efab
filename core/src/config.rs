//! Client settings, loaded from TOML and overridable from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::request::DEFAULT_TIMEOUT;

pub const DEFAULT_BASE_URL: &str = "/api";
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";

pub const ENV_BASE_URL: &str = "API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "API_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Prefix for endpoint paths that are not absolute URLs.
    pub base_url: String,
    /// Deadline for requests that do not set their own.
    pub timeout_ms: u64,
    /// Storage key the auth token is persisted under.
    pub token_key: String,
    /// Where `FileStore` keeps the token. `None` means memory only.
    pub token_file: Option<PathBuf>,
    /// `tracing` filter directive for the `api-call` binary, e.g.
    /// `"api_core=debug"`. `API_LOG` and `RUST_LOG` take precedence.
    pub log_filter: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
            token_file: None,
            log_filter: None,
        }
    }
}

impl ClientConfig {
    /// # Errors
    ///
    /// Returns an error when `raw` is not valid TOML for this struct or sets
    /// a zero timeout.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        config.validate()
    }

    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `API_BASE_URL` and `API_TIMEOUT_MS` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when `API_TIMEOUT_MS` is not a positive integer.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_MS,
                value: value.clone(),
            })?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "/api");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.token_key, "auth_token");
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn toml_fields_override_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://example.com/api"
            timeout_ms = 5000
            token_file = "/tmp/token.json"
            log_filter = "api_core=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://example.com/api");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.token_key, "auth_token");
        assert_eq!(config.token_file, Some(PathBuf::from("/tmp/token.json")));
        assert_eq!(config.log_filter.as_deref(), Some("api_core=debug"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ClientConfig::from_toml_str("retries = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::from_toml_str("timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }

    #[test]
    fn environment_overrides_apply() {
        let env = HashMap::from([
            (ENV_BASE_URL, "http://localhost:8080/api".to_string()),
            (ENV_TIMEOUT_MS, "1500".to_string()),
        ]);
        let config = ClientConfig::default()
            .with_overrides(|name| env.get(name).cloned())
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn malformed_timeout_override_is_rejected() {
        let err = ClientConfig::default()
            .with_overrides(|name| (name == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_TIMEOUT_MS, .. }));
    }
}
