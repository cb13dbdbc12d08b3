//! API Integration Tests
//!
//! The router runs against the in-memory vector store and the hashing
//! embedder, so no external services are needed.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use biosem_api::{create_router, state::AppState};
use biosem_core::{AppConfig, Metadata};
use biosem_retriever::{EmbeddingCache, Retriever, SearchService};
use biosem_vector::{HashEmbedding, InMemoryStore, StoredPoint};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const DIM: usize = 64;
const COLLECTION: &str = "biology_multimodal";

async fn create_test_app() -> Router {
    create_router(Arc::new(AppState::new(
        AppConfig::default(),
        SearchService::ready(create_test_retriever().await),
    )))
}

async fn create_test_retriever() -> Retriever {
    let embedder = Arc::new(HashEmbedding::new(DIM));
    let store = Arc::new(InMemoryStore::new());
    store.create_collection(COLLECTION, DIM).await;

    let items = [
        ("a1", "text", "insulin regulates glucose uptake", Some(2021)),
        ("b2", "image", "confocal image of pancreatic islets", Some(2020)),
        ("c3", "sequence", "ATGGCCCTGTGGATGCGCCTCCTGCCC insulin gene", None),
        ("d4", "experiment", "glucose clamp in insulin resistant mice", Some(2021)),
    ];
    for (id, content_type, content, year) in items {
        let mut body = json!({
            "content_type": content_type,
            "content": content,
            "metadata": {}
        });
        if let Some(year) = year {
            body["year"] = json!(year);
            body["metadata"]["year"] = json!(year);
        }
        let payload: Metadata = body.as_object().cloned().unwrap();
        store
            .insert(
                COLLECTION,
                StoredPoint::new(id, embedder.embed_sync(content).unwrap(), payload),
            )
            .await
            .unwrap();
    }

    Retriever::new(embedder, store, COLLECTION)
}

fn create_unavailable_app() -> Router {
    let service = SearchService::unavailable(COLLECTION, "Failed to load CLIP text model");
    create_router(Arc::new(AppState::new(AppConfig::default(), service)))
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request("GET", "/health", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["retriever_loaded"], true);
    assert_eq!(json["collection"], COLLECTION);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_embedding_cache() {
    let (_, json) = send(
        create_test_app().await,
        create_json_request("GET", "/health", None),
    )
    .await;
    assert!(json.get("embedding_cache").is_none());

    let retriever = create_test_retriever()
        .await
        .with_cache(EmbeddingCache::new(100, Duration::from_secs(60)));
    let app = create_router(Arc::new(AppState::new(
        AppConfig::default(),
        SearchService::ready(retriever),
    )));

    for _ in 0..2 {
        let (status, _) = send(
            app.clone(),
            create_json_request("POST", "/api/search", Some(json!({"query": "insulin"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(app, create_json_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["embedding_cache"]["hits"], 1);
    assert_eq!(json["embedding_cache"]["misses"], 1);
    assert_eq!(json["embedding_cache"]["writes"], 1);
    assert_eq!(json["embedding_cache"]["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_reports_unloaded_retriever() {
    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("GET", "/health", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["retriever_loaded"], false);
}

#[tokio::test]
async fn test_readiness() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request("GET", "/ready", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);

    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("GET", "/ready", None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
    assert!(json["reason"]
        .as_str()
        .unwrap()
        .contains("Failed to load CLIP text model"));
}

// =============================================================================
// Search Tests
// =============================================================================

#[tokio::test]
async fn test_search_end_to_end() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request(
            "POST",
            "/api/search",
            Some(json!({"query": "glucose metabolism", "top_k": 5})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "glucose metabolism");
    assert_eq!(json["total_results"], 4);
    assert_eq!(json["filters"]["output_type"], Value::Null);
    assert_eq!(json["filters"]["year"], Value::Null);

    let results = json["results"].as_array().unwrap();
    let a1 = results.iter().find(|r| r["id"] == "a1").unwrap();
    assert_eq!(a1["content_type"], "text");
    assert_eq!(a1["metadata"]["year"], 2021);
    assert!(a1["score"].is_number());

    let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_search_with_filters() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request(
            "POST",
            "/api/search",
            Some(json!({"query": "insulin", "output_type": "experiment", "year": 2021})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_results"], 1);
    assert_eq!(json["results"][0]["id"], "d4");
    assert_eq!(json["filters"]["output_type"], "experiment");
    assert_eq!(json["filters"]["year"], 2021);
}

#[tokio::test]
async fn test_search_unknown_type_is_empty() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request(
            "POST",
            "/api/search",
            Some(json!({"query": "insulin", "output_type": "protein-structure"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_results"], 0);
    assert_eq!(json["results"], json!([]));
}

#[tokio::test]
async fn test_search_missing_query() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request("POST", "/api/search", Some(json!({"top_k": 5}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Query parameter required");
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_search_rejects_bad_top_k() {
    for top_k in [0, 101] {
        let (status, _) = send(
            create_test_app().await,
            create_json_request(
                "POST",
                "/api/search",
                Some(json!({"query": "insulin", "top_k": top_k})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_search_malformed_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/search")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(create_test_app().await, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_search_when_unavailable() {
    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("POST", "/api/search", Some(json!({"query": "insulin"}))),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

// =============================================================================
// Collection Tests
// =============================================================================

#[tokio::test]
async fn test_stats() {
    let (status, json) = send(
        create_test_app().await,
        create_json_request("GET", "/api/stats", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["collection_name"], COLLECTION);
    assert_eq!(json["total_points"], 4);
    assert_eq!(json["vector_dimension"], DIM);
    assert_eq!(json["content_types"]["text"], 1);
    assert_eq!(json["approximate"], false);
}

#[tokio::test]
async fn test_stats_when_unavailable() {
    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("GET", "/api/stats", None),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_content_types_catalog() {
    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("GET", "/api/content-types", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let values: Vec<&str> = json["content_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, ["text", "image", "sequence", "experiment"]);
}

#[tokio::test]
async fn test_openapi_document() {
    let (status, json) = send(
        create_unavailable_app(),
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/search"].is_object());
    assert_eq!(
        json["components"]["schemas"]["HealthResponse"]["properties"]["status"]["example"],
        "healthy"
    );
}
