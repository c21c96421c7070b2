// tests/common/mod.rs
//
// Shared builders for integration tests. Feeds are generated relative to
// `Utc::now()` so entries always fall inside the staleness window.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use news_aggregator::{
    CacheError, FetchStrategy, FixtureTransport, InMemoryNewsCache, NewsCache, NewsService,
    SelectorConfig, Source, SourceCatalog, SourceConfig,
};

pub const TTL: Duration = Duration::from_secs(15 * 60);

/// `https://<slug>.test/rss` and `https://<slug>.test/news`.
pub fn source(name: &str) -> SourceConfig {
    let slug = name.to_ascii_lowercase().replace(' ', "-");
    SourceConfig::new(
        name,
        &format!("https://{slug}.test/rss"),
        &format!("https://{slug}.test/news"),
        8,
    )
}

pub fn catalog(names: &[&str]) -> Arc<SourceCatalog> {
    Arc::new(SourceCatalog::new(names.iter().map(|n| source(n)).collect()).expect("valid catalog"))
}

/// RSS 2.0 document; items are `(title, link, minutes_ago)`.
pub fn rss_feed(items: &[(&str, &str, i64)]) -> String {
    let now = Utc::now();
    let body: String = items
        .iter()
        .map(|(title, link, ago)| {
            format!(
                "<item><title>{title}</title><link>{link}</link><pubDate>{}</pubDate></item>",
                (now - chrono::Duration::minutes(*ago)).to_rfc2822()
            )
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>t</title>{body}</channel></rss>"#)
}

/// Atom document; entries are `(title, link, minutes_ago)`.
pub fn atom_feed(entries: &[(&str, &str, i64)]) -> String {
    let now = Utc::now();
    let body: String = entries
        .iter()
        .map(|(title, link, ago)| {
            format!(
                r#"<entry><title>{title}</title><link rel="alternate" href="{link}"/><updated>{}</updated></entry>"#,
                (now - chrono::Duration::minutes(*ago)).to_rfc3339()
            )
        })
        .collect();
    format!(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>t</title>{body}</feed>"#)
}

/// HTML page with `<h3><a href=..>title</a></h3>` blocks.
pub fn html_page(links: &[(&str, &str)]) -> String {
    let body: String = links
        .iter()
        .map(|(href, title)| format!(r#"<h3><a href="{href}">{title}</a></h3>"#))
        .collect();
    format!("<!DOCTYPE html><html><head><title>x</title></head><body>{body}</body></html>")
}

pub fn strategy(transport: Arc<FixtureTransport>) -> Arc<FetchStrategy> {
    Arc::new(FetchStrategy::new(
        transport,
        Arc::new(SelectorConfig::builtin()),
    ))
}

pub fn service(
    cache: Arc<dyn NewsCache>,
    catalog: Arc<SourceCatalog>,
    transport: Arc<FixtureTransport>,
) -> NewsService {
    NewsService::new(cache, catalog, strategy(transport))
}

pub fn memory_cache(ttl: Duration) -> Arc<InMemoryNewsCache> {
    Arc::new(InMemoryNewsCache::new(ttl))
}

/// In-memory cache whose writes can be switched to fail.
pub struct FlakyCache {
    inner: InMemoryNewsCache,
    pub fail_writes: AtomicBool,
}

impl FlakyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: InMemoryNewsCache::new(ttl),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NewsCache for FlakyCache {
    fn ttl(&self) -> Duration {
        self.inner.ttl()
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn last_refresh(&self) -> Result<DateTime<Utc>, CacheError> {
        self.inner.last_refresh().await
    }

    async fn update_source(&self, source: Source) -> Result<(), CacheError> {
        self.check()?;
        self.inner.update_source(source).await
    }

    async fn get_source(&self, name: &str) -> Result<Option<Source>, CacheError> {
        self.inner.get_source(name).await
    }

    async fn get_all_sources(&self) -> Result<HashMap<String, Source>, CacheError> {
        self.inner.get_all_sources().await
    }

    async fn refresh(&self) -> Result<(), CacheError> {
        self.check()?;
        self.inner.refresh().await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.check()?;
        self.inner.clear().await
    }
}
