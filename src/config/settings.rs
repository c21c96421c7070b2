// src/config/settings.rs
use std::time::Duration;

use crate::ingest::http::MAX_RETRIES;

/// Upper bound for `*_MINUTES` values (one week).
pub const MAX_MINUTES: i64 = 7 * 24 * 60;

pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const ENV_REFRESH_INTERVAL_MINUTES: &str = "REFRESH_INTERVAL_MINUTES";
pub const ENV_CACHE_TTL_MINUTES: &str = "CACHE_TTL_MINUTES";
pub const ENV_CACHE_BACKEND: &str = "CACHE_BACKEND";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_REDIS_NAMESPACE: &str = "REDIS_NAMESPACE";
pub const ENV_SCHEDULER_ENABLED: &str = "SCHEDULER_ENABLED";
pub const ENV_SCHEDULER_INITIAL_DELAY_SECONDS: &str = "SCHEDULER_INITIAL_DELAY_SECONDS";
pub const ENV_HTTP_TIMEOUT_SECONDS: &str = "HTTP_TIMEOUT_SECONDS";
pub const ENV_HTTP_RETRIES: &str = "HTTP_RETRIES";
pub const ENV_ENABLE_METRICS: &str = "ENABLE_METRICS";
pub const ENV_LOG_JSON: &str = "LOG_JSON";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    /// Zero disables the background scheduler.
    pub refresh_interval: Duration,
    pub cache_ttl: Duration,
    pub cache_backend: CacheBackendKind,
    pub redis_url: Option<String>,
    pub redis_namespace: String,
    pub scheduler_enabled: bool,
    pub scheduler_initial_delay: Duration,
    pub http_timeout: Duration,
    pub http_retries: u32,
    pub metrics_enabled: bool,
    pub log_json: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let minutes = |key: &str, default: i64| {
            let m = get(key)
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(default);
            Duration::from_secs((m.clamp(0, MAX_MINUTES) as u64).saturating_mul(60))
        };

        let cache_backend = match get(ENV_CACHE_BACKEND)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => CacheBackendKind::Redis,
            _ => CacheBackendKind::Memory,
        };

        Self {
            environment: get(ENV_ENVIRONMENT).unwrap_or_else(|| "local".to_string()),
            bind_addr: get(ENV_BIND_ADDR).unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            cors_origins: get(ENV_CORS_ORIGINS)
                .map(|v| parse_origins(&v))
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
            refresh_interval: minutes(ENV_REFRESH_INTERVAL_MINUTES, 15),
            cache_ttl: minutes(ENV_CACHE_TTL_MINUTES, 15),
            cache_backend,
            redis_url: get(ENV_REDIS_URL),
            redis_namespace: get(ENV_REDIS_NAMESPACE).unwrap_or_else(|| "news_cache".to_string()),
            scheduler_enabled: parse_bool(get(ENV_SCHEDULER_ENABLED)).unwrap_or(true),
            scheduler_initial_delay: Duration::from_secs(
                get(ENV_SCHEDULER_INITIAL_DELAY_SECONDS)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5),
            ),
            http_timeout: Duration::from_secs(
                get(ENV_HTTP_TIMEOUT_SECONDS)
                    .and_then(|v| v.parse::<u64>().ok())
                    .filter(|s| *s > 0)
                    .unwrap_or(10),
            ),
            http_retries: get(ENV_HTTP_RETRIES)
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(MAX_RETRIES)
                .min(MAX_RETRIES),
            metrics_enabled: parse_bool(get(ENV_ENABLE_METRICS)).unwrap_or(false),
            log_json: parse_bool(get(ENV_LOG_JSON)).unwrap_or(true),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Interval handed to the scheduler; zero when it is switched off.
    pub fn effective_refresh_interval(&self) -> Duration {
        if self.scheduler_enabled {
            self.refresh_interval
        } else {
            Duration::ZERO
        }
    }
}

fn parse_bool(raw: Option<String>) -> Option<bool> {
    match raw?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepts `a,b,c` or a JSON array.
fn parse_origins(raw: &str) -> Vec<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
