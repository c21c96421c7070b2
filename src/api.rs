use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::NewsError;
use crate::ingest::scheduler::RefreshScheduler;
use crate::metrics::Metrics;
use crate::models::{to_utc_string, SourceConfig};
use crate::service::{AggregateView, NewsService, RefreshSummary, StatusView};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NewsService>,
    pub metrics: Option<Metrics>,
    pub scheduler: Option<Arc<RefreshScheduler<NewsService>>>,
}

impl AppState {
    pub fn new(service: Arc<NewsService>) -> Self {
        Self {
            service,
            metrics: None,
            scheduler: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<RefreshScheduler<NewsService>>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}

/// Errors rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl From<NewsError> for ApiError {
    fn from(e: NewsError) -> Self {
        match e {
            NewsError::SourceNotFound(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Internal(d) => (StatusCode::INTERNAL_SERVER_ERROR, d),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/news", get(get_news))
        .route("/api/sources", get(get_sources))
        .route("/api/sources/{name}/status", get(get_source_status))
        .route("/api/refresh", post(refresh))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::very_permissive();
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn get_news(State(state): State<AppState>) -> Result<Json<AggregateView>, ApiError> {
    let view = state.service.fetch_all().await;
    if view.active_sources == 0 {
        return Err(ApiError::Internal("No sources available".to_string()));
    }
    Ok(Json(view))
}

async fn get_sources(State(state): State<AppState>) -> Json<Vec<SourceConfig>> {
    Json(state.service.get_sources_config())
}

async fn get_source_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(state.service.get_source_status(&name).await?))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshSummary>, ApiError> {
    state
        .service
        .refresh_news()
        .await
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("Error refreshing news: {e}")))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.service.cache();
    let status = match cache.cache_status().await {
        Ok(s) => s.as_str(),
        Err(e) => {
            tracing::warn!(error = %e, "health: cache status unavailable");
            "unknown"
        }
    };
    let last_refresh = cache.last_refresh().await.ok().map(to_utc_string);
    let (enabled, running, interval_seconds) = match &state.scheduler {
        Some(s) => (!s.interval().is_zero(), s.is_running(), s.interval().as_secs()),
        None => (false, false, 0),
    };

    Json(json!({
        "status": "healthy",
        "timestamp": to_utc_string(chrono::Utc::now()),
        "service": env!("CARGO_PKG_NAME"),
        "cache": {
            "backend": cache.backend_name(),
            "status": status,
            "last_refresh": last_refresh,
        },
        "scheduler": {
            "enabled": enabled,
            "running": running,
            "interval_seconds": interval_seconds,
        },
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(m) => m.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
