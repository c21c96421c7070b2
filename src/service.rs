// src/service.rs
//! Refresh orchestration: cache hit vs. miss, bounded fan-out over the
//! enabled sources, degrade-to-cache on cycle failure, and the wire views
//! handed to the HTTP layer.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{CacheStatus, NewsCache};
use crate::catalog::SourceCatalog;
use crate::error::NewsError;
use crate::ingest::scheduler::Refreshable;
use crate::ingest::FetchStrategy;
use crate::models::{to_utc_string, Headline, Source, SourceConfig, SourceStatus};

pub const MAX_WORKERS: usize = 8;
pub const REFRESH_MESSAGE: &str = "Refresh triggered successfully";

/// Pool size for one cycle: `min(8, max(1, n))`.
pub fn worker_count(sources: usize) -> usize {
    sources.clamp(1, MAX_WORKERS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineView {
    pub title: String,
    pub link: String,
    pub published_at: String,
    pub source: String,
}

impl From<&Headline> for HeadlineView {
    fn from(h: &Headline) -> Self {
        Self {
            title: h.title().to_string(),
            link: h.link().to_string(),
            published_at: to_utc_string(h.published_at()),
            source: h.source().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceView {
    pub name: String,
    pub headlines: Vec<HeadlineView>,
    pub status: SourceStatus,
    pub last_updated: Option<String>,
    pub story_count: usize,
}

impl From<&Source> for SourceView {
    fn from(s: &Source) -> Self {
        Self {
            name: s.name().to_string(),
            headlines: s.headlines.iter().map(HeadlineView::from).collect(),
            status: s.status,
            last_updated: s.last_updated.map(to_utc_string),
            story_count: s.headlines.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateView {
    pub sources: Vec<SourceView>,
    pub total_sources: usize,
    pub active_sources: usize,
    /// Global refresh timestamp; `None` only for the synthetic aggregate.
    pub last_updated: Option<String>,
    pub cache_status: CacheStatus,
}

impl AggregateView {
    /// Returned when a cycle failed and nothing was ever cached.
    pub fn unavailable() -> Self {
        Self {
            sources: Vec::new(),
            total_sources: 0,
            active_sources: 0,
            last_updated: None,
            cache_status: CacheStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub message: String,
    pub sources_to_refresh: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub source: String,
    pub status: SourceStatus,
    /// `None` iff `status` is active.
    pub error: Option<String>,
    pub last_attempt: String,
    pub last_success: Option<String>,
}

/// Outcome counts of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Tasks that panicked or could not write their snapshot.
    pub task_errors: usize,
}

pub struct NewsService {
    cache: Arc<dyn NewsCache>,
    catalog: Arc<SourceCatalog>,
    fetcher: Arc<FetchStrategy>,
}

impl NewsService {
    pub fn new(
        cache: Arc<dyn NewsCache>,
        catalog: Arc<SourceCatalog>,
        fetcher: Arc<FetchStrategy>,
    ) -> Self {
        Self {
            cache,
            catalog,
            fetcher,
        }
    }

    pub fn cache(&self) -> &Arc<dyn NewsCache> {
        &self.cache
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Serve from a fresh, non-empty cache; otherwise run a cycle first.
    /// Never fails: a broken cycle degrades to whatever is cached, or to
    /// [`AggregateView::unavailable`] when nothing ever was.
    pub async fn fetch_all(&self) -> AggregateView {
        match self.try_fetch_all().await {
            Ok(view) => view,
            Err(e) => {
                tracing::error!(error = %e, "refresh cycle failed, degrading to cached data");
                self.degraded().await
            }
        }
    }

    async fn try_fetch_all(&self) -> Result<AggregateView, NewsError> {
        if self.cache.is_fresh().await? && self.cache.total_sources_count().await? > 0 {
            counter!("news_cache_hit_total").increment(1);
            tracing::debug!("serving fresh cached data");
            return self.format_response().await;
        }
        self.run_cycle().await?;
        self.format_response().await
    }

    async fn degraded(&self) -> AggregateView {
        match self.cache.total_sources_count().await {
            Ok(n) if n > 0 => match self.format_response().await {
                Ok(view) => view,
                Err(e) => {
                    tracing::error!(error = %e, "cached data unreadable");
                    AggregateView::unavailable()
                }
            },
            Ok(_) => AggregateView::unavailable(),
            Err(e) => {
                tracing::error!(error = %e, "cache unreadable");
                AggregateView::unavailable()
            }
        }
    }

    /// One fan-out over the enabled sources. Each source runs in its own task
    /// behind a shared permit pool; a failing or panicking task is logged and
    /// counted, never propagated. The global timestamp is stamped only after
    /// every task has finished.
    pub async fn run_cycle(&self) -> Result<CycleReport, NewsError> {
        let sources = self.catalog.enabled();
        let permits = Arc::new(Semaphore::new(worker_count(sources.len())));
        let mut report = CycleReport {
            attempted: sources.len(),
            ..CycleReport::default()
        };
        tracing::info!(sources = sources.len(), workers = worker_count(sources.len()), "refresh cycle started");

        let mut tasks = JoinSet::new();
        for cfg in sources {
            let permits = Arc::clone(&permits);
            let fetcher = Arc::clone(&self.fetcher);
            let cache = Arc::clone(&self.cache);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.context("worker pool closed")?;
                let snapshot = fetcher.fetch_source(&cfg).await;
                let active = snapshot.is_active();
                cache
                    .update_source(snapshot)
                    .await
                    .with_context(|| format!("storing snapshot for {}", cfg.name))?;
                anyhow::Ok(active)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(true)) => report.succeeded += 1,
                Ok(Ok(false)) => report.failed += 1,
                Ok(Err(e)) => {
                    report.task_errors += 1;
                    tracing::error!(error = %format!("{e:#}"), "source task failed");
                }
                Err(e) => {
                    report.task_errors += 1;
                    tracing::error!(error = %e, "source task panicked");
                }
            }
        }

        self.cache.refresh().await?;
        counter!("news_refresh_cycles_total").increment(1);
        gauge!("news_refresh_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            task_errors = report.task_errors,
            "refresh cycle finished"
        );
        Ok(report)
    }

    /// Build the aggregate from what is cached right now, in catalog order.
    pub async fn format_response(&self) -> Result<AggregateView, NewsError> {
        let cached = self.cache.get_all_sources().await?;
        let last_refresh = self.cache.last_refresh().await?;
        // Recomputed here: a long cycle can itself outlive the TTL.
        let cache_status = self.cache.cache_status().await?;

        let mut ordered: Vec<&Source> = cached.values().collect();
        ordered.sort_by(|a, b| {
            let pa = self.catalog.position(a.name()).unwrap_or(usize::MAX);
            let pb = self.catalog.position(b.name()).unwrap_or(usize::MAX);
            pa.cmp(&pb).then_with(|| a.name().cmp(b.name()))
        });

        Ok(AggregateView {
            sources: ordered.iter().map(|s| SourceView::from(*s)).collect(),
            total_sources: cached.len(),
            active_sources: cached.values().filter(|s| s.is_active()).count(),
            last_updated: Some(to_utc_string(last_refresh)),
            cache_status,
        })
    }

    /// Every catalog template, enabled or not.
    pub fn get_sources_config(&self) -> Vec<SourceConfig> {
        self.catalog.all().to_vec()
    }

    pub async fn get_source_status(&self, name: &str) -> Result<StatusView, NewsError> {
        let template = self
            .catalog
            .get(name)
            .ok_or_else(|| NewsError::SourceNotFound(name.to_string()))?;
        let source = match self.cache.get_source(name).await? {
            Some(cached) => cached,
            None => template.to_source(),
        };
        let last_attempt = self.cache.last_refresh().await?;

        Ok(StatusView {
            source: source.name().to_string(),
            status: source.status,
            error: (source.status != SourceStatus::Active)
                .then(|| format!("Source has status: {}", source.status)),
            last_attempt: to_utc_string(last_attempt),
            last_success: source.last_updated.map(to_utc_string),
        })
    }

    /// Explicit refresh: clear, then a full cycle. Unlike [`fetch_all`],
    /// failures propagate.
    ///
    /// [`fetch_all`]: NewsService::fetch_all
    pub async fn refresh_news(&self) -> Result<RefreshSummary, NewsError> {
        let sources_to_refresh = self.catalog.enabled().len();
        self.cache.clear().await?;
        self.run_cycle().await?;
        Ok(RefreshSummary {
            message: REFRESH_MESSAGE.to_string(),
            sources_to_refresh,
        })
    }
}

#[async_trait]
impl Refreshable for NewsService {
    async fn refresh(&self) -> anyhow::Result<()> {
        let view = self.fetch_all().await;
        tracing::debug!(
            total = view.total_sources,
            active = view.active_sources,
            status = view.cache_status.as_str(),
            "scheduled fetch"
        );
        Ok(())
    }
}
