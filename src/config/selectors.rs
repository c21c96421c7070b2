// src/config/selectors.rs
//! CSS selectors for the scraping fallback.
//!
//! Optional external document, shaped as
//! `{"sources": {"Name": [".selector", ...]}, "generic": ["...", ...]}`.
//! A missing or malformed file leaves the built-in defaults in place.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SELECTORS_CONFIG_PATH: &str = "SELECTORS_CONFIG_PATH";

pub const DEFAULT_GENERIC_SELECTORS: &[&str] = &[
    "h1 a",
    "h2 a",
    "h3 a",
    ".headline a",
    ".title a",
    "article a",
    ".story-headline a",
    ".news-title a",
    ".article-title a",
];

const WSJ_SELECTORS: &[&str] = &[".WSJTheme--headline--7xZ5j39U a"];
const BLOOMBERG_SELECTORS: &[&str] = &[".headline__text", "h3 a"];
const CNBC_SELECTORS: &[&str] = &[".Card-title", "h3 a"];
const DEALSTREETASIA_SELECTORS: &[&str] = &["h3 a"];

fn builtin_for(source: &str) -> Option<&'static [&'static str]> {
    match source {
        "Wall Street Journal" => Some(WSJ_SELECTORS),
        "Bloomberg" => Some(BLOOMBERG_SELECTORS),
        "CNBC" => Some(CNBC_SELECTORS),
        "DealStreetAsia" => Some(DEALSTREETASIA_SELECTORS),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub sources: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub generic: Vec<String>,
}

impl SelectorConfig {
    /// No external overrides.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: SelectorConfig = serde_json::from_str(s).context("parsing selector config")?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading selectors from {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Reads `$SELECTORS_CONFIG_PATH` when set; otherwise built-in defaults.
    pub fn load_default() -> Self {
        let Some(path) = std::env::var(ENV_SELECTORS_CONFIG_PATH)
            .ok()
            .map(PathBuf::from)
        else {
            return Self::builtin();
        };
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "selector config ignored"
                );
                Self::builtin()
            }
        }
    }

    /// Ordered candidates for one source: external override, then the
    /// built-in per-source list, then the generic list.
    pub fn selectors_for(&self, source: &str) -> Vec<String> {
        if let Some(list) = self.sources.get(source).filter(|l| !l.is_empty()) {
            return list.clone();
        }
        if let Some(list) = builtin_for(source) {
            return list.iter().map(|s| s.to_string()).collect();
        }
        if !self.generic.is_empty() {
            return self.generic.clone();
        }
        DEFAULT_GENERIC_SELECTORS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_override_wins_over_builtin() {
        let cfg = SelectorConfig::from_json(
            r#"{"sources":{"CNBC":[".LatestNews-headline"]},"generic":[".teaser a"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.selectors_for("CNBC"), vec![".LatestNews-headline"]);
        assert_eq!(cfg.selectors_for("Bloomberg"), vec![".headline__text", "h3 a"]);
        assert_eq!(cfg.selectors_for("Unknown"), vec![".teaser a"]);
    }

    #[test]
    fn builtin_generic_for_unknown_sources() {
        let cfg = SelectorConfig::builtin();
        assert_eq!(cfg.selectors_for("Unknown").len(), DEFAULT_GENERIC_SELECTORS.len());
        assert_eq!(cfg.selectors_for("Unknown")[0], "h1 a");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(SelectorConfig::from_json(r#"{"sources": ["nope"]}"#).is_err());
    }
}
