//! Source templates (catalog) and source snapshots (cache).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{is_http_url, Headline};

pub const MIN_STORIES: usize = 5;
pub const MAX_STORIES: usize = 50;
pub const DEFAULT_MAX_STORIES: usize = 8;

fn default_enabled() -> bool {
    true
}
fn default_max_stories() -> usize {
    DEFAULT_MAX_STORIES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Active,
    Error,
    Disabled,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Active => "active",
            SourceStatus::Error => "error",
            SourceStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only catalog entry. Shape matches the catalog override document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Primary structured-feed endpoint.
    #[serde(alias = "primary_url")]
    pub rss_url: String,
    /// Page scraped when the feed fails.
    pub fallback_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_stories")]
    pub max_stories: usize,
}

impl SourceConfig {
    pub fn new(name: &str, rss_url: &str, fallback_url: &str, max_stories: usize) -> Self {
        Self {
            name: name.to_string(),
            rss_url: rss_url.to_string(),
            fallback_url: fallback_url.to_string(),
            enabled: true,
            max_stories,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptySourceName);
        }
        if !is_http_url(&self.rss_url) {
            return Err(ValidationError::InvalidSourceUrl {
                field: "rss_url",
                value: self.rss_url.clone(),
            });
        }
        if !is_http_url(&self.fallback_url) {
            return Err(ValidationError::InvalidSourceUrl {
                field: "fallback_url",
                value: self.fallback_url.clone(),
            });
        }
        if !(MIN_STORIES..=MAX_STORIES).contains(&self.max_stories) {
            return Err(ValidationError::MaxStories {
                value: self.max_stories,
                min: MIN_STORIES,
                max: MAX_STORIES,
            });
        }
        Ok(())
    }

    /// Snapshot used when nothing has been cached for this source yet.
    pub fn to_source(&self) -> Source {
        Source {
            config: self.clone(),
            status: if self.enabled {
                SourceStatus::Active
            } else {
                SourceStatus::Disabled
            },
            last_updated: None,
            headlines: Vec::new(),
        }
    }
}

/// Outcome of one fetch attempt for one source. Replaces, never merges with,
/// the previous snapshot of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub config: SourceConfig,
    pub status: SourceStatus,
    pub last_updated: Option<DateTime<Utc>>,
    /// Most recent first.
    pub headlines: Vec<Headline>,
}

impl Source {
    /// `last_updated` is the fetch time of the first headline; a successful
    /// fetch that yielded nothing has no such time.
    pub fn succeeded(config: &SourceConfig, headlines: Vec<Headline>) -> Self {
        Self {
            config: config.clone(),
            status: SourceStatus::Active,
            last_updated: headlines.first().map(Headline::fetched_at),
            headlines,
        }
    }

    /// Both fetch paths failed: the previous headlines are discarded.
    pub fn failed(config: &SourceConfig) -> Self {
        Self {
            config: config.clone(),
            status: SourceStatus::Error,
            last_updated: None,
            headlines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_active(&self) -> bool {
        self.status == SourceStatus::Active
    }
}
