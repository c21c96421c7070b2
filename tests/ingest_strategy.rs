// tests/ingest_strategy.rs
//
// Primary -> fallback state machine for a single source, driven by canned
// transport answers (no sockets).

mod common;

use std::sync::Arc;

use news_aggregator::{FetchStrategy, FixtureTransport, SelectorConfig, SourceStatus};

use common::{atom_feed, html_page, rss_feed, source, strategy};

#[tokio::test]
async fn primary_feed_success_skips_fallback() {
    let cfg = source("Alpha");
    let transport = Arc::new(FixtureTransport::new().with_body(
        &cfg.rss_url,
        rss_feed(&[
            ("Second story from the feed", "https://alpha.test/2", 30),
            ("First story from the feed", "https://alpha.test/1", 5),
        ]),
    ));
    let s = strategy(transport.clone()).fetch_source(&cfg).await;

    assert_eq!(s.status, SourceStatus::Active);
    assert_eq!(s.headlines.len(), 2);
    assert_eq!(s.headlines[0].title(), "First story from the feed");
    assert!(s.last_updated.is_some());
    assert_eq!(transport.requests(), vec![cfg.rss_url.clone()]);
}

#[tokio::test]
async fn atom_feed_is_accepted() {
    let cfg = source("Alpha");
    let transport = Arc::new(FixtureTransport::new().with_body(
        &cfg.rss_url,
        atom_feed(&[("Atom formatted market story", "https://alpha.test/a", 15)]),
    ));
    let s = strategy(transport).fetch_source(&cfg).await;
    assert_eq!(s.status, SourceStatus::Active);
    assert_eq!(s.headlines[0].link(), "https://alpha.test/a");
}

#[tokio::test]
async fn failed_feed_falls_back_to_scraping() {
    let cfg = source("Beta");
    let transport = Arc::new(
        FixtureTransport::new()
            .with_status(&cfg.rss_url, 500)
            .with_body(
                &cfg.fallback_url,
                html_page(&[("/story/1", "Scraped headline about markets")]),
            ),
    );
    let s = strategy(transport.clone()).fetch_source(&cfg).await;

    assert_eq!(s.status, SourceStatus::Active);
    assert_eq!(s.headlines.len(), 1);
    assert_eq!(s.headlines[0].link(), "https://beta.test/story/1");
    assert_eq!(s.headlines[0].published_at(), s.headlines[0].fetched_at());
    assert_eq!(
        transport.requests(),
        vec![cfg.rss_url.clone(), cfg.fallback_url.clone()]
    );
}

#[tokio::test]
async fn html_served_at_feed_url_triggers_fallback() {
    let cfg = source("Beta");
    let page = html_page(&[("/story/9", "Headline only reachable by scraping")]);
    let transport = Arc::new(
        FixtureTransport::new()
            .with_body(&cfg.rss_url, page.clone())
            .with_body(&cfg.fallback_url, page),
    );
    let s = strategy(transport.clone()).fetch_source(&cfg).await;
    assert_eq!(s.status, SourceStatus::Active);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn both_paths_failing_yields_error_snapshot() {
    let cfg = source("Gamma");
    let transport = Arc::new(FixtureTransport::new().with_status(&cfg.rss_url, 404));
    let s = strategy(transport).fetch_source(&cfg).await;

    assert_eq!(s.status, SourceStatus::Error);
    assert!(s.headlines.is_empty());
    assert!(s.last_updated.is_none());
}

#[tokio::test]
async fn page_without_matches_is_a_failure() {
    let cfg = source("Gamma");
    let transport = Arc::new(
        FixtureTransport::new()
            .with_status(&cfg.rss_url, 503)
            .with_body(&cfg.fallback_url, "<html><body><p>No headlines here</p></body></html>"),
    );
    let s = strategy(transport).fetch_source(&cfg).await;
    assert_eq!(s.status, SourceStatus::Error);
}

#[tokio::test]
async fn empty_feed_is_a_success_with_zero_headlines() {
    let cfg = source("Delta");
    let transport = Arc::new(FixtureTransport::new().with_body(&cfg.rss_url, rss_feed(&[])));
    let s = strategy(transport.clone()).fetch_source(&cfg).await;
    assert_eq!(s.status, SourceStatus::Active);
    assert!(s.headlines.is_empty());
    // Nothing fetched, so nothing to date the snapshot with.
    assert!(s.last_updated.is_none());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn external_selectors_take_priority() {
    let cfg = source("Epsilon");
    let html = r#"<html><body>
        <h3><a href="/generic">Generic heading that should not win</a></h3>
        <div class="lead"><a href="/lead">Lead story picked by override</a></div>
    </body></html>"#;
    let transport = Arc::new(
        FixtureTransport::new()
            .with_status(&cfg.rss_url, 502)
            .with_body(&cfg.fallback_url, html),
    );
    let selectors =
        SelectorConfig::from_json(r#"{"sources":{"Epsilon":[".lead a"]}}"#).expect("selector json");
    let s = FetchStrategy::new(transport, Arc::new(selectors))
        .fetch_source(&cfg)
        .await;

    assert_eq!(s.headlines.len(), 1);
    assert_eq!(s.headlines[0].link(), "https://epsilon.test/lead");
}

#[tokio::test]
async fn stale_and_invalid_entries_are_skipped_not_fatal() {
    let cfg = source("Zeta");
    let feed = rss_feed(&[
        ("Fresh and perfectly valid entry", "https://zeta.test/ok", 10),
        ("Entry from two weeks ago", "https://zeta.test/old", 60 * 24 * 14),
        ("Entry with a relative link", "/relative", 20),
        ("tiny", "https://zeta.test/tiny", 20),
    ]);
    let transport = Arc::new(FixtureTransport::new().with_body(&cfg.rss_url, feed));
    let s = strategy(transport).fetch_source(&cfg).await;

    assert_eq!(s.status, SourceStatus::Active);
    let links: Vec<_> = s.headlines.iter().map(|h| h.link()).collect();
    assert_eq!(links, vec!["https://zeta.test/ok"]);
}
