//! Freshness-aware store of per-source snapshots.
//!
//! One capability set ([`NewsCache`]), two realizations: [`InMemoryNewsCache`]
//! (one process-local map behind one lock) and [`RedisNewsCache`] (a shared
//! Redis instance). Callers only ever hold `Arc<dyn NewsCache>`.
//!
//! Writing a source snapshot never advances the global refresh timestamp;
//! only [`NewsCache::refresh`] does, after a whole cycle has been written.

pub mod in_memory;
pub mod redis_cache;

pub use self::in_memory::InMemoryNewsCache;
pub use self::redis_cache::RedisNewsCache;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CacheBackendKind, Settings};
use crate::error::CacheError;
use crate::models::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
    /// Only used by the synthetic aggregate when nothing was ever cached.
    Error,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Error => "error",
        }
    }
}

#[async_trait]
pub trait NewsCache: Send + Sync {
    /// Fixed freshness threshold.
    fn ttl(&self) -> Duration;

    /// Backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    async fn last_refresh(&self) -> Result<DateTime<Utc>, CacheError>;

    /// Replace the snapshot stored under `source.name()`.
    async fn update_source(&self, source: Source) -> Result<(), CacheError>;

    async fn get_source(&self, name: &str) -> Result<Option<Source>, CacheError>;

    async fn get_all_sources(&self) -> Result<HashMap<String, Source>, CacheError>;

    /// Stamp the global refresh timestamp with the current time.
    async fn refresh(&self) -> Result<(), CacheError>;

    /// Drop every entry and leave the cache stale.
    async fn clear(&self) -> Result<(), CacheError>;

    async fn is_fresh_at(&self, now: DateTime<Utc>) -> Result<bool, CacheError> {
        let last = self.last_refresh().await?;
        Ok(is_fresh(last, now, self.ttl()))
    }

    async fn is_fresh(&self) -> Result<bool, CacheError> {
        self.is_fresh_at(Utc::now()).await
    }

    async fn cache_status(&self) -> Result<CacheStatus, CacheError> {
        Ok(if self.is_fresh().await? {
            CacheStatus::Fresh
        } else {
            CacheStatus::Stale
        })
    }

    async fn active_sources_count(&self) -> Result<usize, CacheError> {
        let all = self.get_all_sources().await?;
        Ok(all.values().filter(|s| s.is_active()).count())
    }

    async fn total_sources_count(&self) -> Result<usize, CacheError> {
        Ok(self.get_all_sources().await?.len())
    }
}

/// `now - last_refresh < ttl`.
pub fn is_fresh(last_refresh: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(last_refresh) < ttl_delta(ttl)
}

/// A timestamp guaranteed to read as stale: one minute past the TTL.
pub fn stale_timestamp(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(ttl_delta(ttl) + chrono::Duration::minutes(1))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// TTLs are capped at a century so date arithmetic stays in range.
fn ttl_delta(ttl: Duration) -> chrono::Duration {
    let cap = chrono::Duration::days(36_500);
    chrono::Duration::from_std(ttl).map_or(cap, |d| d.min(cap))
}

/// Pick the configured backend. An unreachable Redis falls back to the
/// in-memory store with a warning instead of failing startup.
pub async fn build_cache(settings: &Settings) -> Arc<dyn NewsCache> {
    if settings.cache_backend == CacheBackendKind::Redis {
        match settings.redis_url.as_deref() {
            Some(url) => {
                match RedisNewsCache::connect(url, &settings.redis_namespace, settings.cache_ttl)
                    .await
                {
                    Ok(cache) => {
                        tracing::info!(namespace = %settings.redis_namespace, "using redis news cache");
                        return Arc::new(cache);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "redis backend unavailable; falling back to in-memory")
                    }
                }
            }
            None => tracing::warn!("CACHE_BACKEND=redis without REDIS_URL; using in-memory cache"),
        }
    }
    Arc::new(InMemoryNewsCache::new(settings.cache_ttl))
}
