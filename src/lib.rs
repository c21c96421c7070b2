// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::{build_cache, CacheStatus, InMemoryNewsCache, NewsCache, RedisNewsCache};
pub use crate::catalog::SourceCatalog;
pub use crate::config::{SelectorConfig, Settings};
pub use crate::error::{CacheError, FetchError, NewsError, ValidationError};
pub use crate::ingest::http::{FixtureTransport, HttpTransport, Transport};
pub use crate::ingest::scheduler::{RefreshScheduler, Refreshable};
pub use crate::ingest::FetchStrategy;
pub use crate::models::{Headline, Source, SourceConfig, SourceStatus};
pub use crate::service::{AggregateView, NewsService, RefreshSummary, StatusView};
