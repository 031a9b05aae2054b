//! HTTP server implementation using axum.

use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use coinvol_core::StatisticRecord;
use coinvol_telemetry::Metrics;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::query::{BatchView, QueryService};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    query: QueryService,
    config: ApiConfig,
}

impl AppState {
    pub fn new(query: QueryService, config: ApiConfig) -> Self {
        Self { query, config }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stats", get(list_stats))
        .route("/stats/{pair}", get(get_stat))
        .route("/batch", get(get_batch))
        .route("/metrics", get(get_metrics))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    limit: Option<String>,
}

fn parse_limit(raw: Option<&str>) -> ApiResult<Option<usize>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ApiError::BadRequest("limit must be positive".to_string())),
        Ok(limit) => Ok(Some(limit)),
        Err(_) => Err(ApiError::BadRequest(format!("Invalid limit: {raw}"))),
    }
}

fn record_read<T>(route: &str, result: &ApiResult<T>) {
    let label = match result {
        Ok(_) => "ok",
        Err(ApiError::NoBatchMarker) => "no_batch",
        Err(ApiError::NotFound(_)) => "not_found",
        Err(ApiError::BadRequest(_)) => "bad_request",
        Err(_) => "error",
    };
    Metrics::read(route, label);
}

/// `GET /stats?limit=N`
async fn list_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> ApiResult<Json<Vec<StatisticRecord>>> {
    let result = parse_limit(params.limit.as_deref()).and_then(|requested| {
        let limit = state.config.clamp_limit(requested);
        Ok(state.query.rank_top(limit)?)
    });
    record_read("stats", &result);
    result.map(Json)
}

/// `GET /stats/{pair}`. `pair` arrives percent-decoded (`bitcoin%2Fusd`).
async fn get_stat(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> ApiResult<Json<StatisticRecord>> {
    let result = lookup(&state.query, &pair);
    record_read("stat", &result);
    result.map(Json)
}

fn lookup(query: &QueryService, pair: &str) -> ApiResult<StatisticRecord> {
    query
        .get_by_pair(pair)?
        .ok_or_else(|| ApiError::NotFound(pair.to_string()))
}

/// `GET /batch`
async fn get_batch(State(state): State<AppState>) -> ApiResult<Json<BatchView>> {
    let result = state.query.batch_status().map_err(ApiError::from);
    record_read("batch", &result);
    result.map(Json)
}

/// `GET /metrics`
async fn get_metrics() -> Response {
    match Metrics::gather_text() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Bind the API listener on `0.0.0.0:{port}`.
pub async fn bind(config: &ApiConfig) -> ApiResult<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = config.port, "HTTP API listening");
    Ok(listener)
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn run_server(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> ApiResult<()> {
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    debug!("HTTP server drained");
    Ok(())
}
