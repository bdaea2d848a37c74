// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Pipeline settings resolved from the environment.

use std::str::FromStr;
use std::time::Duration;

/// Default quote host path; symbols are appended as `/{SYMBOL}:{EXCHANGE}`.
pub const DEFAULT_QUOTE_BASE_URL: &str = "https://www.google.com/finance/quote";

const DEFAULT_CACHE_TTL_SECS: u64 = 900;
const DEFAULT_REQUEST_DELAY_MS: u64 = 3_000;
const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SETTLE_DELAY_MS: u64 = 3_000;
const DEFAULT_QUEUE_WAIT_SECS: u64 = 120;

/// Tunables for the acquisition pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Freshness window of the result cache.
    pub cache_ttl: Duration,
    /// Minimum gap between two consecutive queued fetches.
    pub request_delay: Duration,
    /// Hard bound on one page load, navigation through snapshot.
    pub navigation_timeout: Duration,
    /// Pause after navigation so client-side rendering can finish.
    pub settle_delay: Duration,
    /// Longest a caller waits on the queue before giving up.
    pub queue_wait: Duration,
    /// Serve static table entries without touching the queue.
    pub static_first: bool,
    pub quote_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            navigation_timeout: Duration::from_millis(DEFAULT_NAV_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            queue_wait: Duration::from_secs(DEFAULT_QUEUE_WAIT_SECS),
            static_first: true,
            quote_base_url: DEFAULT_QUOTE_BASE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Resolve every setting from `PE_SCOUT_*` variables, keeping the default
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Self {
            cache_ttl: Duration::from_secs(parse_or(
                read("PE_SCOUT_CACHE_TTL_SECS"),
                "PE_SCOUT_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            request_delay: Duration::from_millis(parse_or(
                read("PE_SCOUT_REQUEST_DELAY_MS"),
                "PE_SCOUT_REQUEST_DELAY_MS",
                DEFAULT_REQUEST_DELAY_MS,
            )),
            navigation_timeout: Duration::from_millis(parse_or(
                read("PE_SCOUT_NAV_TIMEOUT_MS"),
                "PE_SCOUT_NAV_TIMEOUT_MS",
                DEFAULT_NAV_TIMEOUT_MS,
            )),
            settle_delay: Duration::from_millis(parse_or(
                read("PE_SCOUT_SETTLE_DELAY_MS"),
                "PE_SCOUT_SETTLE_DELAY_MS",
                DEFAULT_SETTLE_DELAY_MS,
            )),
            queue_wait: Duration::from_secs(parse_or(
                read("PE_SCOUT_QUEUE_WAIT_SECS"),
                "PE_SCOUT_QUEUE_WAIT_SECS",
                DEFAULT_QUEUE_WAIT_SECS,
            )),
            static_first: read("PE_SCOUT_STATIC_FIRST")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.static_first),
            quote_base_url: read("PE_SCOUT_QUOTE_BASE_URL")
                .filter(|v| !v.is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.quote_base_url),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring {key}={raw:?}: not a number, using {default}");
            default
        }),
    }
}
