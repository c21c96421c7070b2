//! A single article reference attributed to a source.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::is_http_url;

pub const MIN_TITLE_CHARS: usize = 10;
pub const MAX_TITLE_CHARS: usize = 500;
/// Entries published longer ago than this are dropped at fetch time.
pub const MAX_HEADLINE_AGE_DAYS: i64 = 7;

/// Immutable once built. [`Headline::new`] is the only validating constructor;
/// snapshots read back from a cache backend are trusted as stored, since the
/// staleness window is measured at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    title: String,
    link: String,
    published_at: DateTime<Utc>,
    source: String,
    fetched_at: DateTime<Utc>,
}

impl Headline {
    /// Validate against the current wall clock.
    pub fn new(
        title: &str,
        link: &str,
        published_at: DateTime<Utc>,
        source: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::validated_at(title, link, published_at, source, fetched_at, Utc::now())
    }

    /// Validate with an explicit "now" for the staleness check.
    pub fn validated_at(
        title: &str,
        link: &str,
        published_at: DateTime<Utc>,
        source: &str,
        fetched_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let len = title.chars().count();
        if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&len) {
            return Err(ValidationError::TitleLength {
                len,
                min: MIN_TITLE_CHARS,
                max: MAX_TITLE_CHARS,
            });
        }

        let link = link.trim();
        if !is_http_url(link) {
            return Err(ValidationError::InvalidLink(link.to_string()));
        }

        if !within_window(published_at, now) {
            return Err(ValidationError::Stale {
                published_at,
                max_age_days: MAX_HEADLINE_AGE_DAYS,
            });
        }

        let source = source.trim();
        if source.is_empty() {
            return Err(ValidationError::EmptySourceName);
        }

        Ok(Self {
            title: title.to_string(),
            link: link.to_string(),
            published_at,
            source: source.to_string(),
            fetched_at,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// `true` when `published_at` is no older than [`MAX_HEADLINE_AGE_DAYS`] at `now`.
pub fn within_window(published_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(published_at) <= Duration::days(MAX_HEADLINE_AGE_DAYS)
}
