// src/catalog.rs
//! Source catalog: the fixed set of sources a refresh cycle walks.
//!
//! Built-in defaults can be replaced by an override document (JSON or TOML)
//! shaped as `{"sources": [{name, rss_url, fallback_url, enabled, max_stories}, ...]}`.
//! Any failure to read, parse or validate the document falls back to the defaults.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::SourceConfig;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";

#[derive(Debug, Clone)]
pub struct SourceCatalog {
    sources: Vec<SourceConfig>,
}

impl SourceCatalog {
    /// Validated catalog; names must be unique.
    pub fn new(sources: Vec<SourceConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for s in &sources {
            s.validate()
                .with_context(|| format!("invalid source entry '{}'", s.name))?;
            if !seen.insert(s.name.clone()) {
                bail!("duplicate source name '{}'", s.name);
            }
        }
        Ok(Self { sources })
    }

    pub fn builtin() -> Self {
        Self {
            sources: builtin_sources(),
        }
    }

    /// Load an override document from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source catalog from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::new(parse_catalog(&content, &ext)?)
    }

    /// Resolve the override using env var + fallbacks, else built-in defaults:
    /// 1) $SOURCES_CONFIG_PATH
    /// 2) config/sources.toml
    /// 3) config/sources.json
    pub fn load_default() -> Self {
        let candidate = match std::env::var(ENV_SOURCES_CONFIG_PATH) {
            Ok(p) => Some(PathBuf::from(p)),
            Err(_) => ["config/sources.toml", "config/sources.json"]
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let Some(path) = candidate else {
            return Self::builtin();
        };
        match Self::load_from(&path) {
            Ok(catalog) => {
                tracing::info!(
                    path = %path.display(),
                    sources = catalog.sources.len(),
                    "loaded source catalog override"
                );
                catalog
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "source catalog override rejected, using built-in sources"
                );
                Self::builtin()
            }
        }
    }

    pub fn all(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn enabled(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Catalog order, used to keep aggregate views stable.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name == name)
    }
}

fn parse_catalog(s: &str, hint_ext: &str) -> Result<Vec<SourceConfig>> {
    #[derive(serde::Deserialize)]
    struct CatalogDoc {
        sources: Vec<SourceConfig>,
    }

    let try_toml = hint_ext == "toml";
    if try_toml {
        if let Ok(doc) = toml::from_str::<CatalogDoc>(s) {
            return Ok(doc.sources);
        }
    }
    if let Ok(doc) = serde_json::from_str::<CatalogDoc>(s) {
        return Ok(doc.sources);
    }
    if !try_toml {
        if let Ok(doc) = toml::from_str::<CatalogDoc>(s) {
            return Ok(doc.sources);
        }
    }
    Err(anyhow!("unsupported source catalog format"))
}

fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "Wall Street Journal",
            "https://feeds.wsj.com/rss/WSJcomUSBusiness",
            "https://www.wsj.com/news/business",
            50,
        ),
        SourceConfig::new(
            "Bloomberg",
            "https://feeds.bloomberg.com/markets/news.rss",
            "https://www.bloomberg.com/markets",
            50,
        ),
        SourceConfig::new(
            "CNBC",
            "https://www.cnbc.com/id/100003114/device/rss/rss.html",
            "https://www.cnbc.com/markets/",
            50,
        ),
        SourceConfig::new(
            "Financial Times",
            "https://www.ft.com/markets?format=rss",
            "https://www.ft.com/markets",
            50,
        ),
        SourceConfig::new(
            "The Business Times (Singapore)",
            "https://www.businesstimes.com.sg/rss.xml",
            "https://www.businesstimes.com.sg/",
            50,
        ),
        SourceConfig::new(
            "South China Morning Post",
            "https://www.scmp.com/rss/4/feed",
            "https://www.scmp.com/business",
            50,
        ),
    ]
}
