//! Collection statistics and content-type catalog handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use biosem_core::{content_type_catalog, CollectionStats, ContentTypeInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Collection statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    #[schema(example = "biology_multimodal")]
    pub collection_name: String,
    pub total_points: u64,
    /// Status reported by the vector store (green, yellow, red)
    #[schema(example = "green")]
    pub status: String,
    #[schema(example = 512)]
    pub vector_dimension: usize,
    /// Content-type tally over the sampled points
    pub content_types: BTreeMap<String, u64>,
    pub sampled_points: u64,
    /// True when the tally covers only part of the collection
    pub approximate: bool,
}

impl From<CollectionStats> for StatsResponse {
    fn from(stats: CollectionStats) -> Self {
        Self {
            collection_name: stats.collection_name,
            total_points: stats.total_points,
            status: stats.status,
            vector_dimension: stats.vector_dimension,
            content_types: stats.content_types,
            sampled_points: stats.sampled_points,
            approximate: stats.approximate,
        }
    }
}

/// Get collection statistics
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "collection",
    responses(
        (status = 200, description = "Collection statistics", body = StatsResponse),
        (status = 502, description = "Vector store failure", body = crate::error::ApiError),
        (status = 503, description = "Retriever not initialized", body = crate::error::ApiError)
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, AppError> {
    state.increment_requests();

    let stats = state.service.collection_info().await?;
    tracing::debug!(
        total_points = stats.total_points,
        sampled = stats.sampled_points,
        "Collection stats served"
    );

    Ok(Json(stats.into()))
}

/// One entry of the content-type catalog
#[derive(Debug, Serialize, ToSchema)]
pub struct ContentTypeEntry {
    #[schema(example = "text")]
    pub value: String,
    #[schema(example = "Text (Papers & Protocols)")]
    pub label: String,
    pub description: String,
}

impl From<ContentTypeInfo> for ContentTypeEntry {
    fn from(info: ContentTypeInfo) -> Self {
        Self {
            value: info.value,
            label: info.label,
            description: info.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContentTypesResponse {
    pub content_types: Vec<ContentTypeEntry>,
}

/// List the searchable content types
#[utoipa::path(
    get,
    path = "/api/content-types",
    tag = "collection",
    responses(
        (status = 200, description = "Content-type catalog", body = ContentTypesResponse)
    )
)]
pub async fn content_types_handler() -> Json<ContentTypesResponse> {
    Json(ContentTypesResponse {
        content_types: content_type_catalog().into_iter().map(Into::into).collect(),
    })
}
