pub mod config;
pub mod engine;
pub mod service;

use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use config::ServerConfig;
use cpsearch_core::Platform;
use engine::{SearchEngine, SearchHit};
use serde::{Deserialize, Serialize};
use service::PlatformStatus;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Platform slug or "all"
    pub platform: Option<String>,
    /// Zero or negative means unbounded
    pub limit: Option<i64>,
    pub threshold: Option<f32>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub platform: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub platforms: Vec<PlatformStatus>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub default_threshold: f32,
    pub default_limit: usize,
}

pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let engine = Arc::new(SearchEngine::for_data_dir(&config.data_dir, config.max_matrix_bytes));
    Ok(build_router(engine, config))
}

pub fn build_router(engine: Arc<SearchEngine>, config: &ServerConfig) -> Router {
    let app_state = AppState { engine, default_threshold: config.default_threshold, default_limit: config.default_limit };

    let origins: Vec<_> = config.cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn parse_filter(raw: Option<&str>) -> Result<Option<Platform>, (StatusCode, String)> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse::<Platform>().map(Some).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string())),
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let filter = parse_filter(params.platform.as_deref())?;
    let limit = match params.limit {
        Some(n) if n <= 0 => 0,
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => state.default_limit,
    };
    let threshold = params.threshold.filter(|t| t.is_finite()).unwrap_or(state.default_threshold);

    let results = state.engine.search(&params.q, filter, limit, threshold).await;
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, hits = results.len(), took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse {
        query: params.q,
        platform: filter.map_or_else(|| "all".to_string(), |p| p.to_string()),
        took_s: elapsed.as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", platforms: state.engine.status().await })
}
