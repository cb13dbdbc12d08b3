//! BioSemantica API - HTTP server for multimodal biology search
//!
//! Exposes semantic search over the shared CLIP embedding space, collection
//! statistics, and the content-type catalog as JSON endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use handlers::{collection, health, search};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "BioSemantica API",
        description = "Multimodal semantic search over biology research content"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        search::search_handler,
        collection::stats_handler,
        collection::content_types_handler,
    ),
    components(
        schemas(
            health::HealthResponse,
            health::EmbeddingCacheStats,
            health::ReadinessResponse,
            search::SearchRequest,
            search::SearchResponse,
            search::AppliedFilters,
            collection::StatsResponse,
            collection::ContentTypeEntry,
            collection::ContentTypesResponse,
            error::ApiError,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "search", description = "Semantic search"),
        (name = "collection", description = "Collection statistics and catalog")
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise the listed ones
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
