//! Process-local realization: one map, one lock.
//!
//! The lock is only ever held for the in-memory access itself and never
//! across an `.await`, so fetch tasks cannot block each other on it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{stale_timestamp, NewsCache};
use crate::error::CacheError;
use crate::models::Source;

#[derive(Debug)]
pub struct InMemoryNewsCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

#[derive(Debug)]
struct Inner {
    sources: HashMap<String, Source>,
    last_refresh: DateTime<Utc>,
}

impl InMemoryNewsCache {
    /// Starts empty and stale.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sources: HashMap::new(),
                last_refresh: stale_timestamp(Utc::now(), ttl),
            }),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NewsCache for InMemoryNewsCache {
    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn last_refresh(&self) -> Result<DateTime<Utc>, CacheError> {
        Ok(self.lock().last_refresh)
    }

    async fn update_source(&self, source: Source) -> Result<(), CacheError> {
        let mut inner = self.lock();
        inner.sources.insert(source.name().to_string(), source);
        Ok(())
    }

    async fn get_source(&self, name: &str) -> Result<Option<Source>, CacheError> {
        Ok(self.lock().sources.get(name).cloned())
    }

    async fn get_all_sources(&self) -> Result<HashMap<String, Source>, CacheError> {
        Ok(self.lock().sources.clone())
    }

    async fn refresh(&self) -> Result<(), CacheError> {
        self.lock().last_refresh = Utc::now();
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.lock();
        inner.sources.clear();
        inner.last_refresh = stale_timestamp(Utc::now(), self.ttl);
        Ok(())
    }

    async fn active_sources_count(&self) -> Result<usize, CacheError> {
        Ok(self.lock().sources.values().filter(|s| s.is_active()).count())
    }

    async fn total_sources_count(&self) -> Result<usize, CacheError> {
        Ok(self.lock().sources.len())
    }
}
