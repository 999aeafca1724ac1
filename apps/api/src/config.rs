use std::time::Duration;

use anyhow::{bail, Context, Result};

/// What a `Deferred` loader does with a failed construction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// First failure is final for the process lifetime.
    CacheFailure,
    /// Re-run the factory on the next call (default; a transient dependency
    /// outage should not wedge a subsystem permanently).
    RetryEveryCall,
    /// Re-run the factory, but not more often than the backoff interval.
    RetryWithBackoff(Duration),
}

/// Application configuration loaded from environment variables.
///
/// Provider credentials are individually optional: the fallback chain skips
/// unconfigured providers and degrades to its terminal fallback if none are
/// set. Nothing here fails process boot except a malformed value.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_root: String,
    /// `None` when unset or empty after trimming.
    pub openrouter_api_key: Option<String>,
    pub hf_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub agent_retry_policy: RetryPolicy,
    pub frontend_origins: Option<Vec<String>>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            data_root: std::env::var("DATA_ROOT").unwrap_or_else(|_| "/app/data".to_string()),
            openrouter_api_key: optional_env("OPENROUTER_API_KEY"),
            hf_api_key: optional_env("HF_API_KEY"),
            llm_timeout: secs_env("LLM_TIMEOUT_SECS", 20)?,
            probe_timeout: secs_env("PROBE_TIMEOUT_SECS", 5)?,
            request_timeout: secs_env("REQUEST_TIMEOUT_SECS", 60)?,
            agent_retry_policy: retry_policy_env("AGENT_RETRY_POLICY")?,
            frontend_origins: std::env::var("FRONTEND_ORIGINS").ok().map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            }),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn db_path(&self) -> String {
        format!("{}/career_ai.db", self.data_root.trim_end_matches('/'))
    }
}

/// Reads an optional credential. Whitespace-only values count as absent so a
/// stray `KEY=" "` in a deploy environment does not look configured.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs_env(key: &str, default: u64) -> Result<Duration> {
    let secs = match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}

fn retry_policy_env(key: &str) -> Result<RetryPolicy> {
    match std::env::var(key) {
        Err(_) => Ok(RetryPolicy::RetryEveryCall),
        Ok(v) => match v.trim() {
            "" | "retry" => Ok(RetryPolicy::RetryEveryCall),
            "cache-failure" => Ok(RetryPolicy::CacheFailure),
            "backoff" => Ok(RetryPolicy::RetryWithBackoff(Duration::from_secs(30))),
            other => bail!("{key} must be one of retry|cache-failure|backoff, got '{other}'"),
        },
    }
}
