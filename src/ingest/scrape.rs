// src/ingest/scrape.rs
//! Fallback path: pull headline links out of an HTML page with CSS selectors.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and the
//! parsed document never lives across an `.await`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::FetchError;
use crate::ingest::normalize_text;
use crate::models::headline::MIN_TITLE_CHARS;
use crate::models::{Headline, SourceConfig};

/// Try `selectors` in order against `html`; the first one that yields at
/// least one valid headline wins. Scraped pages carry no reliable dates, so
/// every headline is stamped with `fetched_at`.
pub fn scrape_page(
    html: &str,
    source: &SourceConfig,
    selectors: &[String],
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Headline>, FetchError> {
    let base = Url::parse(&source.fallback_url)
        .map_err(|e| FetchError::PageUrl(format!("{}: {e}", source.fallback_url)))?;
    let document = Html::parse_document(html);

    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(source = %source.name, selector = %raw, error = ?e, "invalid selector skipped");
                continue;
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for element in document.select(&selector) {
            let Some(h) = element_to_headline(element, &base, source, fetched_at) else {
                continue;
            };
            if seen.insert(h.link().to_string()) {
                out.push(h);
            }
            if out.len() >= source.max_stories {
                break;
            }
        }

        if !out.is_empty() {
            tracing::debug!(source = %source.name, selector = %raw, count = out.len(), "selector matched");
            return Ok(out);
        }
    }

    Err(FetchError::NoMatches(source.fallback_url.clone()))
}

fn element_to_headline(
    element: ElementRef<'_>,
    base: &Url,
    source: &SourceConfig,
    fetched_at: DateTime<Utc>,
) -> Option<Headline> {
    let title = normalize_text(&element.text().collect::<Vec<_>>().join(" "));
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }
    let href = link_target(element)?;
    let link = base.join(href.trim()).ok()?;

    match Headline::validated_at(
        &title,
        link.as_str(),
        fetched_at,
        &source.name,
        fetched_at,
        fetched_at,
    ) {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::debug!(source = %source.name, error = %e, "skipping scraped element");
            None
        }
    }
}

/// The element's own `href`, else its first descendant link, else the
/// nearest enclosing link.
fn link_target(element: ElementRef<'_>) -> Option<&str> {
    if let Some(href) = element.value().attr("href").filter(|h| !h.trim().is_empty()) {
        return Some(href);
    }
    let anchor = Selector::parse("a[href]").ok()?;
    if let Some(href) = element
        .select(&anchor)
        .find_map(|a| a.value().attr("href").filter(|h| !h.trim().is_empty()))
    {
        return Some(href);
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
        .filter(|h| !h.trim().is_empty())
}
