//! Process-wide `tracing` setup for the `api-call` binary.
//!
//! The filter directive comes from the first of: `API_LOG`, `RUST_LOG`,
//! `--verbose` (`debug`), the config file's `log_filter`, then `info`.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "API_LOG";

const FALLBACK_DIRECTIVE: &str = "info";

/// Install a fmt subscriber using the directive picked by
/// [`filter_directive`]. Later calls leave the first subscriber in place.
pub fn init_logging(configured: Option<&str>, verbose: bool) {
    let directive = filter_directive(configured, verbose, |name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("ignoring log filter '{directive}': {err}");
        EnvFilter::new(FALLBACK_DIRECTIVE)
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

pub(crate) fn filter_directive(
    configured: Option<&str>,
    verbose: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let from_env = lookup(LOG_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .filter(|value| !value.trim().is_empty());
    if let Some(value) = from_env {
        return value;
    }
    if verbose {
        return "debug".to_owned();
    }
    configured
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(FALLBACK_DIRECTIVE)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn api_log_wins_over_everything() {
        let lookup = env(&[(LOG_ENV, "api_core=trace"), ("RUST_LOG", "warn")]);
        assert_eq!(filter_directive(Some("error"), true, lookup), "api_core=trace");
    }

    #[test]
    fn rust_log_used_when_api_log_unset() {
        let lookup = env(&[("RUST_LOG", "warn")]);
        assert_eq!(filter_directive(Some("error"), true, lookup), "warn");
    }

    #[test]
    fn verbose_beats_config_file() {
        assert_eq!(filter_directive(Some("error"), true, env(&[])), "debug");
    }

    #[test]
    fn config_file_used_without_env_or_flag() {
        assert_eq!(filter_directive(Some("api_core=debug"), false, env(&[])), "api_core=debug");
    }

    #[test]
    fn blank_values_fall_through_to_info() {
        let lookup = env(&[(LOG_ENV, "  ")]);
        assert_eq!(filter_directive(Some(""), false, lookup), "info");
        assert_eq!(filter_directive(None, false, env(&[])), "info");
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(None, false);
        init_logging(Some("debug"), true);
    }
}
