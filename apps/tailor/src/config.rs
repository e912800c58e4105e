use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::batch::MAX_BATCH_JOBS;

/// Client configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    /// Directory holding device-local annotation files.
    pub store_dir: PathBuf,
    pub sync_debounce_ms: u64,
    pub batch_max_jobs: usize,
    pub http_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so parsing is testable without
    /// touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            api_base_url: require_env(&lookup, "TAILOR_API_URL")?,
            api_token: lookup("TAILOR_API_TOKEN").filter(|t| !t.is_empty()),
            store_dir: lookup("TAILOR_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".tailor")),
            sync_debounce_ms: parse_or(&lookup, "PREP_SYNC_DEBOUNCE_MS", 500)?,
            batch_max_jobs: parse_or(&lookup, "BATCH_MAX_JOBS", MAX_BATCH_JOBS)?,
            http_timeout_secs: parse_or(&lookup, "HTTP_TIMEOUT_SECS", 120)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }
}

fn require_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_url_is_set() {
        let config = Config::from_lookup(lookup(&[("TAILOR_API_URL", "https://api.example.com")]))
            .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.api_token, None);
        assert_eq!(config.store_dir, PathBuf::from(".tailor"));
        assert_eq!(config.sync_debounce(), Duration::from_millis(500));
        assert_eq!(config.batch_max_jobs, 10);
        assert_eq!(config.http_timeout_secs, 120);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TAILOR_API_URL"));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("TAILOR_API_URL", "https://api.example.com"),
            ("PREP_SYNC_DEBOUNCE_MS", "soon"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("TAILOR_API_URL", "http://localhost:3000"),
            ("TAILOR_API_TOKEN", "secret"),
            ("PREP_SYNC_DEBOUNCE_MS", "250"),
            ("BATCH_MAX_JOBS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.sync_debounce_ms, 250);
        assert_eq!(config.batch_max_jobs, 5);
    }
}
