// src/ingest/http.rs
//! Outbound GET transport shared by both fetch paths.
//!
//! [`HttpTransport`] wraps one pooled `reqwest::Client`; [`FixtureTransport`]
//! serves canned bodies so nothing under test ever touches the network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::error::FetchError;

/// Statuses treated as transient.
pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
pub const MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(300);

pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+headline aggregator)"
);

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Feed,
    Page,
}

impl Accept {
    fn header_value(self) -> &'static str {
        match self {
            Accept::Feed => FEED_ACCEPT,
            Accept::Page => PAGE_ACCEPT,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body of a 2xx answer.
    async fn get_text(&self, url: &str, accept: Accept) -> Result<String, FetchError>;
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// `base * 2^(attempt-1)` for attempt >= 1.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    retries: u32,
    backoff: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, retries: u32) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            retries: retries.min(MAX_RETRIES),
            backoff: DEFAULT_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str, accept: Accept) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            let res = self
                .client
                .get(url)
                .header(ACCEPT, accept.header_value())
                .send()
                .await;

            let retry = match &res {
                Ok(resp) => is_retryable_status(resp.status().as_u16()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };
            if retry && attempt < self.retries {
                attempt += 1;
                let delay = backoff_delay(self.backoff, attempt);
                tracing::debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                tokio::time::sleep(delay).await;
                continue;
            }

            let resp = res.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            return resp.text().await.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            });
        }
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

/// In-memory transport for tests and offline runs. Unknown URLs answer 503.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    routes: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), Canned::Body(body.into()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, url: &str, _accept: Accept) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_string());
        match self.routes.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            }),
        }
    }
}
