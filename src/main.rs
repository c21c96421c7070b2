//! Headline aggregator - binary entrypoint.
//! Loads configuration, wires cache, fetcher, orchestrator and scheduler,
//! then serves the HTTP boundary until Ctrl-C / SIGTERM.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use news_aggregator::{
    api, build_cache, logging, metrics::Metrics, FetchStrategy, HttpTransport, NewsService,
    RefreshScheduler, SelectorConfig, Settings, SourceCatalog,
};

/// Env files read at startup, in order. Real environment variables win.
const ENV_FILES: &[&str] = &["config/app/backend.env", ".env"];

fn load_env_files() {
    for candidate in ENV_FILES {
        if Path::new(candidate).exists() {
            let _ = dotenvy::from_filename(candidate);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_files();
    let settings = Settings::from_env();
    logging::init(&settings);
    tracing::info!(environment = %settings.environment, "starting news aggregator");

    let metrics = if settings.metrics_enabled {
        Some(Metrics::init(settings.cache_ttl.as_secs()).context("initializing metrics")?)
    } else {
        None
    };

    let cache = build_cache(&settings).await;
    let catalog = Arc::new(SourceCatalog::load_default());
    let selectors = Arc::new(SelectorConfig::load_default());
    let transport = Arc::new(
        HttpTransport::new(settings.http_timeout, settings.http_retries)
            .context("building http client")?,
    );
    let fetcher = Arc::new(FetchStrategy::new(transport, selectors));
    let service = Arc::new(NewsService::new(cache, catalog, fetcher));

    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&service),
        settings.effective_refresh_interval(),
        settings.scheduler_initial_delay,
    ));
    scheduler.start();

    let mut state = api::AppState::new(Arc::clone(&service)).with_scheduler(Arc::clone(&scheduler));
    if let Some(m) = metrics {
        state = state.with_metrics(m);
    }
    let app = api::router(state, &settings.cors_origins);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    tracing::info!(addr = %settings.bind_addr, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server");

    scheduler.stop().await;
    tracing::info!("shutdown complete");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
