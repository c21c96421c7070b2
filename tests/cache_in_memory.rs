// tests/cache_in_memory.rs
//
// Freshness and ownership rules of the process-local cache.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use news_aggregator::{CacheStatus, Headline, InMemoryNewsCache, NewsCache, Source, SourceStatus};

use common::{source, TTL};

fn snapshot(name: &str, titles: &[&str]) -> Source {
    let cfg = source(name);
    let now = Utc::now();
    let headlines = titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            Headline::new(t, &format!("https://x.test/{i}"), now, name, now).expect("valid headline")
        })
        .collect();
    Source::succeeded(&cfg, headlines)
}

#[tokio::test]
async fn new_cache_is_empty_and_stale() {
    let cache = InMemoryNewsCache::new(TTL);
    assert!(!cache.is_fresh().await.unwrap());
    assert_eq!(cache.cache_status().await.unwrap(), CacheStatus::Stale);
    assert_eq!(cache.total_sources_count().await.unwrap(), 0);
}

#[tokio::test]
async fn update_then_get_returns_equal_snapshot() {
    let cache = InMemoryNewsCache::new(TTL);
    let s = snapshot("Alpha", &["First headline of the day"]);
    cache.update_source(s.clone()).await.unwrap();
    assert_eq!(cache.get_source("Alpha").await.unwrap(), Some(s));
    assert_eq!(cache.get_source("Beta").await.unwrap(), None);
}

#[tokio::test]
async fn update_replaces_and_never_advances_timestamp() {
    let cache = InMemoryNewsCache::new(TTL);
    let before = cache.last_refresh().await.unwrap();

    cache
        .update_source(snapshot("Alpha", &["Old headline from earlier", "Another old headline"]))
        .await
        .unwrap();
    let failed = Source::failed(&source("Alpha"));
    cache.update_source(failed.clone()).await.unwrap();

    assert_eq!(cache.last_refresh().await.unwrap(), before);
    assert!(!cache.is_fresh().await.unwrap());
    let stored = cache.get_source("Alpha").await.unwrap().unwrap();
    assert_eq!(stored.status, SourceStatus::Error);
    assert!(stored.headlines.is_empty());
}

#[tokio::test]
async fn refresh_marks_fresh_and_clear_forces_stale() {
    let cache = InMemoryNewsCache::new(TTL);
    cache
        .update_source(snapshot("Alpha", &["Some headline for alpha"]))
        .await
        .unwrap();
    cache.refresh().await.unwrap();
    assert!(cache.is_fresh().await.unwrap());
    assert_eq!(cache.cache_status().await.unwrap(), CacheStatus::Fresh);

    cache.clear().await.unwrap();
    assert!(!cache.is_fresh().await.unwrap());
    assert_eq!(cache.total_sources_count().await.unwrap(), 0);

    // Still stale even though it is empty and was fresh a moment ago.
    let now = Utc::now();
    let last = cache.last_refresh().await.unwrap();
    assert!(now - last > chrono::Duration::from_std(TTL).unwrap());
}

#[tokio::test]
async fn zero_ttl_is_never_fresh() {
    let cache = InMemoryNewsCache::new(Duration::ZERO);
    cache.refresh().await.unwrap();
    assert!(!cache.is_fresh().await.unwrap());
}

#[tokio::test]
async fn counts_distinguish_active_sources() {
    let cache = InMemoryNewsCache::new(TTL);
    cache
        .update_source(snapshot("Alpha", &["Alpha headline number one"]))
        .await
        .unwrap();
    cache
        .update_source(Source::failed(&source("Beta")))
        .await
        .unwrap();
    cache
        .update_source(source("Gamma").disabled().to_source())
        .await
        .unwrap();
    assert_eq!(cache.total_sources_count().await.unwrap(), 3);
    assert_eq!(cache.active_sources_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_do_not_lose_updates() {
    let cache = Arc::new(InMemoryNewsCache::new(TTL));
    let mut handles = Vec::new();
    for i in 0..32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let name = format!("Source {i}");
            cache
                .update_source(snapshot(&name, &["Concurrent headline text"]))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(cache.total_sources_count().await.unwrap(), 32);
}
