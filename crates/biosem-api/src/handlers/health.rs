//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use biosem_retriever::CacheStatsReport;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    #[schema(example = "healthy")]
    pub status: String,
    /// Whether the retrieval core initialized
    pub retriever_loaded: bool,
    /// Collection searched by this instance
    #[schema(example = "biology_multimodal")]
    pub collection: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    /// Present when the query-embedding cache is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_cache: Option<EmbeddingCacheStats>,
}

/// Query-embedding cache counters
#[derive(Serialize, ToSchema)]
pub struct EmbeddingCacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    #[schema(example = 0.42)]
    pub hit_rate: f64,
}

impl From<CacheStatsReport> for EmbeddingCacheStats {
    fn from(report: CacheStatsReport) -> Self {
        Self {
            entries: report.entries,
            hits: report.hits,
            misses: report.misses,
            writes: report.writes,
            hit_rate: report.hit_rate,
        }
    }
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        retriever_loaded: state.service.is_available(),
        collection: state.service.collection().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
        embedding_cache: state.service.cache_stats().map(EmbeddingCacheStats::from),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Readiness probe: core initialized, model and vector store reachable
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                reason: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    reason: Some(e.to_string()),
                }),
            )
        }
    }
}
