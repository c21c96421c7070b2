// src/cache/redis_cache.rs
//! Redis-backed realization, shared across processes.
//!
//! Layout: `{namespace}:sources` holds every snapshot as one JSON object keyed
//! by source name; `{namespace}:last_refresh` holds an RFC 3339 timestamp.
//!
//! Known limitation: `update_source` is a load-modify-store of the whole blob
//! and is not atomic. Two writers updating different sources at the same time
//! can race, and the slower writer's snapshot may be overwritten by the
//! faster one's stale copy of the map. A hardened version needs per-key
//! storage (HSET) or a WATCH/MULTI compare-and-swap.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};

use super::{stale_timestamp, NewsCache};
use crate::error::CacheError;
use crate::models::Source;

#[derive(Clone)]
pub struct RedisNewsCache {
    conn: ConnectionManager,
    namespace: String,
    ttl: Duration,
    redis_url: String,
}

impl fmt::Debug for RedisNewsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisNewsCache")
            .field("redis_url", &self.redis_url)
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("conn", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisNewsCache {
    pub async fn connect(url: &str, namespace: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(redis_url = url, "redis connection manager ready");
        Ok(Self {
            conn,
            namespace: normalize_namespace(namespace),
            ttl,
            redis_url: url.to_string(),
        })
    }

    fn sources_key(&self) -> String {
        format!("{}:sources", self.namespace)
    }

    fn timestamp_key(&self) -> String {
        format!("{}:last_refresh", self.namespace)
    }

    async fn load_sources(&self) -> Result<HashMap<String, Source>, CacheError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(self.sources_key()).await?;
        match payload {
            Some(p) if !p.is_empty() => decode_sources(&p),
            _ => Ok(HashMap::new()),
        }
    }

    async fn store_sources(&self, sources: &HashMap<String, Source>) -> Result<(), CacheError> {
        let payload = encode_sources(sources)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.sources_key(), payload).await?;
        Ok(())
    }
}

#[async_trait]
impl NewsCache for RedisNewsCache {
    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn last_refresh(&self) -> Result<DateTime<Utc>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.timestamp_key()).await?;
        Ok(raw
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| stale_timestamp(Utc::now(), self.ttl)))
    }

    async fn update_source(&self, source: Source) -> Result<(), CacheError> {
        // Not atomic across writers; see module docs.
        let mut sources = self.load_sources().await?;
        sources.insert(source.name().to_string(), source);
        self.store_sources(&sources).await
    }

    async fn get_source(&self, name: &str) -> Result<Option<Source>, CacheError> {
        Ok(self.load_sources().await?.remove(name))
    }

    async fn get_all_sources(&self) -> Result<HashMap<String, Source>, CacheError> {
        self.load_sources().await
    }

    async fn refresh(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.timestamp_key(), Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&[self.sources_key(), self.timestamp_key()])
            .await?;
        Ok(())
    }
}

fn normalize_namespace(ns: &str) -> String {
    let trimmed = ns.trim().trim_end_matches(':');
    if trimmed.is_empty() {
        "news_cache".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn encode_sources(sources: &HashMap<String, Source>) -> Result<String, CacheError> {
    Ok(serde_json::to_string(sources)?)
}

pub(crate) fn decode_sources(payload: &str) -> Result<HashMap<String, Source>, CacheError> {
    Ok(serde_json::from_str(payload)?)
}

/// Missing or unreadable timestamps read as stale.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "invalid last_refresh timestamp in redis");
            None
        }
    }
}
