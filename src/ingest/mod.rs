// src/ingest/mod.rs
//! Per-source fetching: structured feed first, page scraping second.
pub mod feed;
pub mod http;
pub mod scheduler;
pub mod scrape;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SelectorConfig;
use crate::error::FetchError;
use crate::ingest::http::{Accept, Transport};
use crate::models::{Headline, Source, SourceConfig};

static RE_TAGS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").ok());

/// Clean a raw title: decode entities, strip tags, fold typographic quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (feeds often escape markup inside titles)
    if let Some(re) = RE_TAGS.as_ref() {
        out = re.replace_all(&out, " ").to_string();
    }

    // 3) “ ” « » to ", ‘ ’ to '
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Rss,
    Scrape,
}

impl FetchMethod {
    /// Metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            FetchMethod::Rss => "rss",
            FetchMethod::Scrape => "scraping",
        }
    }
}

/// Trying-primary, then trying-fallback; always ends in a fresh snapshot.
#[derive(Clone)]
pub struct FetchStrategy {
    transport: Arc<dyn Transport>,
    selectors: Arc<SelectorConfig>,
}

impl FetchStrategy {
    pub fn new(transport: Arc<dyn Transport>, selectors: Arc<SelectorConfig>) -> Self {
        Self {
            transport,
            selectors,
        }
    }

    /// Fetch and parse the structured feed at `rss_url`.
    pub async fn fetch_primary(&self, source: &SourceConfig) -> Result<Vec<Headline>, FetchError> {
        let body = self.transport.get_text(&source.rss_url, Accept::Feed).await?;
        feed::parse_feed(&body, source, Utc::now())
    }

    /// Fetch `fallback_url` and scrape it with the selectors for this source.
    pub async fn fetch_fallback(&self, source: &SourceConfig) -> Result<Vec<Headline>, FetchError> {
        let body = self
            .transport
            .get_text(&source.fallback_url, Accept::Page)
            .await?;
        let selectors = self.selectors.selectors_for(&source.name);
        scrape::scrape_page(&body, source, &selectors, Utc::now())
    }

    /// Run the whole state machine for one source. Never fails: a source
    /// whose both paths fail comes back with status `error` and no headlines.
    pub async fn fetch_source(&self, source: &SourceConfig) -> Source {
        match self.attempt(source, FetchMethod::Rss).await {
            Ok(headlines) => return Source::succeeded(source, headlines),
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "feed failed, trying page scrape");
            }
        }
        match self.attempt(source, FetchMethod::Scrape).await {
            Ok(headlines) => Source::succeeded(source, headlines),
            Err(e) => {
                tracing::error!(source = %source.name, error = %e, "feed and page scrape both failed");
                Source::failed(source)
            }
        }
    }

    async fn attempt(
        &self,
        source: &SourceConfig,
        method: FetchMethod,
    ) -> Result<Vec<Headline>, FetchError> {
        let t0 = Instant::now();
        let res = match method {
            FetchMethod::Rss => self.fetch_primary(source).await,
            FetchMethod::Scrape => self.fetch_fallback(source).await,
        };
        let (name, label) = (source.name.clone(), method.as_str());
        histogram!("news_fetch_latency_seconds", "source" => name.clone(), "method" => label)
            .record(t0.elapsed().as_secs_f64());
        match &res {
            Ok(h) => {
                counter!("news_fetch_success_total", "source" => name, "method" => label).increment(1);
                tracing::info!(source = %source.name, method = method.as_str(), count = h.len(), "fetched headlines");
            }
            Err(_) => {
                counter!("news_fetch_failure_total", "source" => name, "method" => label).increment(1)
            }
        }
        res
    }
}
