use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Buckets for `news_fetch_latency_seconds`.
const LATENCY_BUCKETS: &[f64] = &[0.1, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0];

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the cache TTL as a
    /// static gauge. Fails if another recorder is already installed.
    pub fn init(cache_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("news_fetch_latency_seconds".to_string()),
                LATENCY_BUCKETS,
            )
            .context("prometheus: latency buckets")?
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe();
        gauge!("news_cache_ttl_seconds").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Prometheus text exposition of every registered series.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// One-time metric descriptions (so series show up with help text).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_fetch_success_total",
            "Successful source fetches, by source and method."
        );
        describe_counter!(
            "news_fetch_failure_total",
            "Failed source fetches, by source and method."
        );
        describe_histogram!(
            "news_fetch_latency_seconds",
            Unit::Seconds,
            "Fetch latency per source and method."
        );
        describe_counter!("news_cache_hit_total", "Requests served from a fresh cache.");
        describe_counter!("news_refresh_cycles_total", "Completed refresh cycles.");
        describe_gauge!(
            "news_refresh_last_run_ts",
            "Unix ts when the last refresh cycle finished."
        );
        describe_gauge!("news_cache_ttl_seconds", "Configured cache TTL.");
    });
}
