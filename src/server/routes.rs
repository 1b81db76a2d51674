use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ingest::{IngestBatch, IngestService};
use crate::retention::RetentionEngine;
use crate::server::AppState;
use crate::stats::StatsAggregator;
use crate::Error;

#[derive(Deserialize)]
pub struct RecentParams {
    pub hours: Option<i64>,
    pub limit: Option<usize>,
    pub platform: Option<String>,
}

#[derive(Deserialize)]
pub struct FilteredParams {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct RulesParams {
    pub enabled_only: Option<bool>,
}

#[derive(Deserialize)]
pub struct CleanupRequest {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type RouteError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: Error) -> RouteError {
    let status = match &e {
        Error::Validation(_) | Error::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Constraint(_) => StatusCode::CONFLICT,
        Error::Storage(_) | Error::Io(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn json_error(e: serde_json::Error) -> RouteError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Socialkg API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "timestamp": now(),
    }))
}

/// Reachability probe: runs live count queries, never a cached value
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let counts = store.counts().map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "database": "connected",
        "stats": counts,
        "timestamp": now(),
    })))
}

/// Batch ingestion: posts plus the filtered/discovery records derived from
/// them. Per-record failures are reported in the body, never as a batch-wide
/// error.
pub async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<IngestBatch>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let report = IngestService::new(&store).ingest(&batch);

    Ok(Json(serde_json::json!({
        "status": "success",
        "posts_stored": report.posts_stored,
        "filtered_stored": report.filtered_stored,
        "discovery_stored": report.discovery_stored,
        "failures": report.failures,
        "timestamp": now(),
    })))
}

pub async fn recent_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let hours = params.hours.unwrap_or(24);
    let limit = params.limit.unwrap_or(100);

    let store = state.store.lock().await;
    let mut posts = store.recent_posts(hours, limit).map_err(error_response)?;

    // platform filtering happens here, not in the store query
    if let Some(platform) = &params.platform {
        posts.retain(|p| &p.platform == platform);
    }

    Ok(Json(serde_json::json!({
        "posts": posts,
        "count": posts.len(),
        "timestamp": now(),
    })))
}

pub async fn filtered_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilteredParams>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let limit = params.limit.unwrap_or(50);

    let store = state.store.lock().await;
    let posts = store
        .filtered_posts(params.category.as_deref(), limit)
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "posts": posts,
        "count": posts.len(),
        "timestamp": now(),
    })))
}

pub async fn discovery_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let stats = StatsAggregator::new(&store)
        .discovery_stats()
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "stats": stats,
        "timestamp": now(),
    })))
}

pub async fn overall_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let stats = StatsAggregator::new(&store)
        .overall_stats()
        .map_err(error_response)?;

    let mut body = serde_json::to_value(stats).map_err(json_error)?;
    body["timestamp"] = serde_json::Value::String(now());
    Ok(Json(body))
}

pub async fn run_cleanup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let results = RetentionEngine::new(&store)
        .run(request.dry_run)
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "dry_run": request.dry_run,
        "results": results,
        "timestamp": now(),
    })))
}

pub async fn cleanup_rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RulesParams>,
) -> Result<Json<serde_json::Value>, RouteError> {
    let store = state.store.lock().await;
    let rules = store
        .cleanup_rules(params.enabled_only.unwrap_or(false))
        .map_err(error_response)?;

    Ok(Json(serde_json::json!({
        "rules": rules,
        "count": rules.len(),
        "timestamp": now(),
    })))
}
