//! Semantic search handler

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use biosem_core::{BioError, SearchQuery, SearchResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Search request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Natural-language query
    #[schema(example = "insulin regulates glucose uptake")]
    pub query: Option<String>,

    /// Maximum number of results (defaults to the configured value, 10)
    #[schema(example = 10)]
    pub top_k: Option<usize>,

    /// Restrict to one content type (text, image, sequence, experiment)
    #[schema(example = "text")]
    pub output_type: Option<String>,

    /// Restrict to one publication year
    #[schema(example = 2021)]
    pub year: Option<i64>,
}

/// Filters echoed back with the results
#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedFilters {
    pub output_type: Option<String>,
    pub year: Option<i64>,
}

/// Search response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Hits in descending score order
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<SearchResult>,
    pub query: String,
    pub total_results: usize,
    pub filters: AppliedFilters,
}

impl SearchRequest {
    /// Check the request against the configured limits
    fn into_query(self, default_top_k: usize, max_top_k: usize) -> Result<SearchQuery, BioError> {
        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| BioError::Validation("Query parameter required".to_string()))?;

        let top_k = self.top_k.unwrap_or(default_top_k);
        if top_k == 0 || top_k > max_top_k {
            return Err(BioError::Validation(format!(
                "top_k must be between 1 and {max_top_k}"
            )));
        }

        Ok(SearchQuery {
            query,
            top_k,
            content_type: self.output_type.filter(|t| !t.is_empty()),
            year: self.year,
        })
    }
}

/// Search the collection
#[utoipa::path(
    post,
    path = "/api/search",
    tag = "search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search successful", body = SearchResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 502, description = "Embedding or vector store failure", body = crate::error::ApiError),
        (status = 503, description = "Retriever not initialized", body = crate::error::ApiError),
        (status = 504, description = "Search timed out", body = crate::error::ApiError)
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    state.increment_requests();

    let Json(req) = payload?;
    let retriever = &state.config.retriever;
    let query = req.into_query(retriever.default_top_k, retriever.max_top_k)?;

    let results = state.service.search(&query).await?;

    tracing::info!(
        query = %query.query,
        top_k = query.top_k,
        output_type = ?query.content_type,
        year = ?query.year,
        results = results.len(),
        "Search served"
    );

    Ok(Json(SearchResponse {
        total_results: results.len(),
        results,
        filters: AppliedFilters {
            output_type: query.content_type,
            year: query.year,
        },
        query: query.query,
    }))
}
