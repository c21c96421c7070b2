//! Error taxonomy shared across the crate.
//!
//! Entry-level problems surface as [`ValidationError`] and are skipped by the
//! fetch paths; source-level problems are [`FetchError`]; the cache layer
//! reports [`CacheError`]; the orchestrator speaks [`NewsError`].

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Rejected construction of a headline or source template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("title must be between {min} and {max} characters, got {len}")]
    TitleLength { len: usize, min: usize, max: usize },

    #[error("link must be an http(s) URL: {0}")]
    InvalidLink(String),

    #[error("published_at {published_at} is older than {max_age_days} days")]
    Stale {
        published_at: DateTime<Utc>,
        max_age_days: i64,
    },

    #[error("source name cannot be empty")]
    EmptySourceName,

    #[error("{field} must be an http(s) URL: {value}")]
    InvalidSourceUrl { field: &'static str, value: String },

    #[error("max_stories must be between {min} and {max}, got {value}")]
    MaxStories { value: usize, min: usize, max: usize },
}

/// A single fetch path (feed or page) failed for one source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed feed: {0}")]
    Feed(String),

    #[error("invalid page URL {0}")]
    PageUrl(String),

    #[error("no selector matched a headline on {0}")]
    NoMatches(String),
}

/// Cache backend failure. The in-memory realization never produces one.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the orchestrator to its consumers.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Source '{0}' not found")]
    SourceNotFound(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
