//! Report configuration
//!
//! Endpoint locations, credentials and polling timings, gathered once and
//! passed explicitly into the resolver and report client.

use crate::error::{ReportError, Result};
use std::time::Duration;

pub const DEFAULT_STATUS_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_REPORT_BASE_URL: &str = "https://firstmerdian.tjdem.online";
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Configuration for the status source, report backend and polling loop
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Base URL of the call-listing API
    pub status_base_url: String,
    /// Base URL of the interview report backend
    pub report_base_url: String,
    /// Bearer token sent to both endpoints
    pub auth_token: String,
    /// Total time allowed for a call to reach the ended state
    pub timeout: Duration,
    /// Wait between consecutive status queries
    pub poll_interval: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            status_base_url: DEFAULT_STATUS_BASE_URL.to_string(),
            report_base_url: DEFAULT_REPORT_BASE_URL.to_string(),
            auth_token: String::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ReportConfig {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let status_base_url = lookup("REPORT_STATUS_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.status_base_url);
        let report_base_url = lookup("REPORT_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.report_base_url);
        let auth_token = lookup("REPORT_AUTH_TOKEN")
            .or_else(|| lookup("VAPI_PRIVATE_API_KEY"))
            .unwrap_or_default();

        let timeout = match lookup("REPORT_TIMEOUT_MS") {
            Some(raw) => parse_millis("REPORT_TIMEOUT_MS", &raw)?,
            None => defaults.timeout,
        };
        let poll_interval = match lookup("REPORT_POLL_INTERVAL_MS") {
            Some(raw) => parse_millis("REPORT_POLL_INTERVAL_MS", &raw)?,
            None => defaults.poll_interval,
        };

        Ok(Self {
            status_base_url: trim_base(&status_base_url),
            report_base_url: trim_base(&report_base_url),
            auth_token,
            timeout,
            poll_interval,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    pub fn with_timings(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ReportError::Config(format!("{} must be milliseconds, got '{}': {}", key, raw, e)))
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
