//! API route definitions

use crate::handlers::{collection, search};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Routes mounted under `/api`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(search::search_handler))
        .route("/stats", get(collection::stats_handler))
        .route("/content-types", get(collection::content_types_handler))
}
