use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::discounts::schema::KeyPolicy;
use crate::documents::readiness::PollPolicy;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_UPLOAD_URL: &str =
    "https://generativelanguage.googleapis.com/upload/v1beta/files";
const MAX_POLL_BACKOFF: f64 = 10.0;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// Second credential scope for the fan-out upload. Optional.
    pub alternate_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_upload_url: String,
    pub gemini_model: String,
    pub gemini_pro_model: String,
    pub llm_timeout_secs: u64,
    pub file_poll_interval_secs: u64,
    pub file_poll_backoff: f64,
    pub file_poll_max_interval_secs: u64,
    pub file_poll_max_attempts: u32,
    pub max_upload_bytes: usize,
    pub strict_template_keys: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            api_key: get("API_KEY")
                .context("Required environment variable 'API_KEY' is not set")?,
            alternate_api_key: get("ALTERNATE_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_upload_url: get("GEMINI_UPLOAD_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_UPLOAD_URL.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            gemini_pro_model: get("GEMINI_PRO_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
            llm_timeout_secs: parse_or(&get, "LLM_TIMEOUT_SECS", 120)?,
            file_poll_interval_secs: parse_or(&get, "FILE_POLL_INTERVAL_SECS", 10)?,
            file_poll_backoff: parse_or(&get, "FILE_POLL_BACKOFF", 1.0)?,
            file_poll_max_interval_secs: parse_or(&get, "FILE_POLL_MAX_INTERVAL_SECS", 60)?,
            file_poll_max_attempts: parse_or(&get, "FILE_POLL_MAX_ATTEMPTS", 30)?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            strict_template_keys: parse_or(&get, "STRICT_TEMPLATE_KEYS", true)?,
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if !config.file_poll_backoff.is_finite()
            || !(0.0..=MAX_POLL_BACKOFF).contains(&config.file_poll_backoff)
        {
            bail!(
                "FILE_POLL_BACKOFF must be between 0 and {MAX_POLL_BACKOFF}, got '{}'",
                config.file_poll_backoff
            );
        }

        Ok(config)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.file_poll_interval_secs),
            backoff: self.file_poll_backoff,
            max_interval: Duration::from_secs(self.file_poll_max_interval_secs),
            max_attempts: self.file_poll_max_attempts,
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        if self.strict_template_keys {
            KeyPolicy::Strict
        } else {
            KeyPolicy::WarnOnly
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = Config::from_lookup(lookup(&[("API_KEY", "k1")])).unwrap();
        assert_eq!(config.api_key, "k1");
        assert!(config.alternate_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.gemini_pro_model, "gemini-2.0-flash-exp");
        assert_eq!(config.file_poll_interval_secs, 10);
        assert_eq!(config.port, 8080);
        assert!(config.strict_template_keys);
        assert_eq!(config.key_policy(), KeyPolicy::Strict);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_empty_alternate_key_is_unset() {
        let config =
            Config::from_lookup(lookup(&[("API_KEY", "k1"), ("ALTERNATE_API_KEY", "  ")])).unwrap();
        assert!(config.alternate_api_key.is_none());
    }

    #[test]
    fn test_invalid_port_fails() {
        let err =
            Config::from_lookup(lookup(&[("API_KEY", "k1"), ("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_poll_policy_from_values() {
        let config = Config::from_lookup(lookup(&[
            ("API_KEY", "k1"),
            ("FILE_POLL_INTERVAL_SECS", "2"),
            ("FILE_POLL_BACKOFF", "1.5"),
            ("FILE_POLL_MAX_INTERVAL_SECS", "8"),
            ("FILE_POLL_MAX_ATTEMPTS", "4"),
            ("STRICT_TEMPLATE_KEYS", "false"),
        ]))
        .unwrap();
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_interval, Duration::from_secs(8));
        assert_eq!(policy.max_attempts, 4);
        assert!((policy.backoff - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.key_policy(), KeyPolicy::WarnOnly);
    }

    #[test]
    fn test_out_of_range_backoff_fails() {
        for raw in ["inf", "NaN", "1e300", "-2", "10.5"] {
            let err = Config::from_lookup(lookup(&[("API_KEY", "k1"), ("FILE_POLL_BACKOFF", raw)]))
                .unwrap_err();
            assert!(err.to_string().contains("FILE_POLL_BACKOFF"), "{raw} accepted");
        }
    }
}
