//! BioSemantica Retriever - Semantic search orchestrator
//!
//! Turns a natural-language query into a filtered nearest-neighbor search:
//! - Embed the query into the shared CLIP space
//! - Build the content-type / year predicate
//! - Run the similarity search against the configured collection
//! - Normalize each hit into a `SearchResult`
//!
//! The retriever performs no input validation and no re-ranking; results
//! keep the order the vector store returned.

use biosem_core::{
    AppConfig, BioError, CollectionStats, Metadata, Result, SearchQuery, SearchResult,
    UNKNOWN_CONTENT_TYPE,
};
use biosem_vector::{lookup_path, EmbeddingClient, FilterBuilder, ScoredPoint, VectorStore};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod cache;
pub mod service;

pub use cache::{CacheStats, CacheStatsReport, EmbeddingCache};
pub use service::SearchService;

// ============================================================================
// Retriever
// ============================================================================

/// Semantic retriever over one collection
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    filters: FilterBuilder,
    cache: Option<EmbeddingCache>,
    timeout: Option<Duration>,
}

impl Retriever {
    /// Create a retriever with default payload keys, no cache and no deadline
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            filters: FilterBuilder::default(),
            cache: None,
            timeout: None,
        }
    }

    /// Create a retriever wired from application config
    pub fn from_config(
        config: &AppConfig,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let mut retriever = Self::new(embedder, store, &config.vector_store.collection)
            .with_filter_builder(FilterBuilder::from_config(&config.vector_store))
            .with_timeout(Duration::from_secs(config.retriever.request_timeout_secs));

        if config.retriever.cache_enabled {
            retriever = retriever.with_cache(EmbeddingCache::new(
                config.retriever.cache_capacity,
                Duration::from_secs(config.retriever.cache_ttl_secs),
            ));
        }

        retriever
    }

    pub fn with_filter_builder(mut self, filters: FilterBuilder) -> Self {
        self.filters = filters;
        self
    }

    /// Cache query embeddings
    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Deadline applied to each search and stats call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingClient> {
        &self.embedder
    }

    pub fn cache_stats(&self) -> Option<CacheStatsReport> {
        self.cache.as_ref().map(EmbeddingCache::report)
    }

    /// Search the collection for items similar to the query text
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.with_deadline(self.search_inner(query)).await
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let start_time = Instant::now();

        let vector = self.embed_query(&query.query).await?;
        tracing::debug!(dimension = vector.len(), "Query embedded");

        let filter = self
            .filters
            .build(query.content_type.as_deref(), query.year);
        tracing::debug!(conditions = filter.conditions().len(), "Filter built");

        let hits = self
            .store
            .similarity_search(&self.collection, &vector, query.top_k, &filter)
            .await?;

        let content_type_field = self.filters.content_type_field();
        let results: Vec<SearchResult> = hits
            .into_iter()
            .map(|hit| normalize_hit(hit, content_type_field))
            .collect();

        tracing::debug!(
            results = results.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(results)
    }

    /// Statistics about the collection
    pub async fn collection_info(&self) -> Result<CollectionStats> {
        self.with_deadline(self.store.collection_stats(&self.collection))
            .await
    }

    /// Check that the embedding model and the vector store both answer
    pub async fn health_check(&self) -> Result<()> {
        self.with_deadline(async {
            self.embedder.embed("").await?;
            self.store.health_check().await
        })
        .await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(vector) = cache.get(text).await {
                return Ok(vector);
            }
            let vector = self.embedder.embed(text).await?;
            cache.put(text, vector.clone()).await;
            return Ok(vector);
        }

        self.embedder.embed(text).await
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| BioError::Timeout(timeout.as_millis() as u64))?,
            None => fut.await,
        }
    }
}

// ============================================================================
// Result normalization
// ============================================================================

/// Project a raw hit onto a `SearchResult`
///
/// Missing fields take neutral values: empty strings, an empty metadata map,
/// no chunk id, and content type `unknown`. Metadata passes through verbatim.
/// The content type is read from `content_type_field`, a dotted payload key.
pub fn normalize_hit(point: ScoredPoint, content_type_field: &str) -> SearchResult {
    let ScoredPoint { id, score, payload } = point;

    let metadata = match payload.get("metadata") {
        Some(Value::Object(map)) => map.clone(),
        _ => Metadata::new(),
    };

    let content_type = match lookup_path(&payload, content_type_field) {
        Some(Value::String(s)) => s.clone(),
        _ => UNKNOWN_CONTENT_TYPE.to_string(),
    };

    let chunk_id = match payload.get("chunk_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    SearchResult {
        id,
        content: text_field(&payload, "content"),
        score,
        metadata,
        content_type,
        chunk_id,
        description: text_field(&payload, "description"),
        full_content: text_field(&payload, "full_content"),
    }
}

fn text_field(payload: &Metadata, key: &str) -> String {
    match payload.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use biosem_vector::{HashEmbedding, InMemoryStore, SearchFilter, StoredPoint};
    use serde_json::json;

    fn payload(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_full_payload() {
        let result = normalize_hit(
            ScoredPoint {
                id: "a1".to_string(),
                score: 0.87,
                payload: payload(json!({
                    "content": "insulin regulates glucose uptake",
                    "content_type": "text",
                    "metadata": {"year": 2021, "source": "PMC"},
                    "chunk_id": "doc-7",
                    "full_content": "insulin regulates glucose uptake in muscle"
                })),
            },
            "content_type",
        );

        assert_eq!(result.id, "a1");
        assert_eq!(result.content_type, "text");
        assert_eq!(result.metadata.get("year"), Some(&json!(2021)));
        assert_eq!(result.chunk_id.as_deref(), Some("doc-7"));
        assert_eq!(result.description, "");
        assert!(result.full_content.starts_with("insulin"));
    }

    #[test]
    fn test_normalize_empty_payload_defaults() {
        let result = normalize_hit(
            ScoredPoint {
                id: "7".to_string(),
                score: 0.1,
                payload: Metadata::new(),
            },
            "content_type",
        );

        assert_eq!(result.content, "");
        assert_eq!(result.content_type, "unknown");
        assert!(result.metadata.is_empty());
        assert_eq!(result.chunk_id, None);
        assert_eq!(result.full_content, "");
    }

    #[test]
    fn test_normalize_numeric_chunk_id() {
        let result = normalize_hit(
            ScoredPoint {
                id: "7".to_string(),
                score: 0.1,
                payload: payload(json!({"chunk_id": 3, "metadata": "not-a-map"})),
            },
            "content_type",
        );

        assert_eq!(result.chunk_id.as_deref(), Some("3"));
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_normalize_reads_configured_content_type_field() {
        let hit = ScoredPoint {
            id: "b2".to_string(),
            score: 0.5,
            payload: payload(json!({
                "content_type": "text",
                "modality": {"kind": "image"}
            })),
        };

        assert_eq!(normalize_hit(hit.clone(), "modality.kind").content_type, "image");
        assert_eq!(normalize_hit(hit, "modality.missing").content_type, "unknown");
    }

    #[tokio::test]
    async fn test_search_uses_configured_content_type_field() {
        let embedder = Arc::new(HashEmbedding::new(16));
        let store = Arc::new(InMemoryStore::new());
        store.create_collection("bio", 16).await;
        store
            .insert(
                "bio",
                StoredPoint::new(
                    "b2",
                    embedder.embed_sync("islet imaging").unwrap(),
                    payload(json!({"modality": {"kind": "image"}})),
                ),
            )
            .await
            .unwrap();

        let retriever = Retriever::new(embedder, store, "bio")
            .with_filter_builder(FilterBuilder::new("modality.kind", "year"));
        let results = retriever
            .search(&SearchQuery::new("islet").with_content_type("image"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_type, "image");
    }

    struct OfflineEmbedder;

    #[async_trait]
    impl EmbeddingClient for OfflineEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(BioError::Embedding("connection refused".to_string()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "offline"
        }
    }

    #[tokio::test]
    async fn test_health_check_requires_embedder() {
        let store = Arc::new(InMemoryStore::new());
        store.create_collection("bio", 8).await;

        let healthy = Retriever::new(Arc::new(HashEmbedding::new(8)), store.clone(), "bio");
        assert!(healthy.health_check().await.is_ok());

        let offline = Retriever::new(Arc::new(OfflineEmbedder), store, "bio");
        let err = offline.health_check().await.unwrap_err();
        assert!(matches!(err, BioError::Embedding(_)));
    }

    struct SlowStore;

    #[async_trait]
    impl VectorStore for SlowStore {
        async fn similarity_search(
            &self,
            _collection: &str,
            _query_vector: &[f32],
            _limit: usize,
            _filter: &SearchFilter,
        ) -> Result<Vec<ScoredPoint>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn collection_stats(&self, _collection: &str) -> Result<CollectionStats> {
            Err(BioError::VectorStore("connection refused".to_string()))
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let retriever = Retriever::new(Arc::new(HashEmbedding::new(8)), Arc::new(SlowStore), "bio")
            .with_timeout(Duration::from_millis(20));

        let err = retriever
            .search(&SearchQuery::new("insulin"))
            .await
            .unwrap_err();
        assert!(matches!(err, BioError::Timeout(20)));
        assert_eq!(err.to_string(), "Operation timed out after 20ms");
    }

    #[tokio::test]
    async fn test_collection_info_error_is_structured() {
        let retriever = Retriever::new(Arc::new(HashEmbedding::new(8)), Arc::new(SlowStore), "bio");
        let err = retriever.collection_info().await.unwrap_err();
        assert!(matches!(err, BioError::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_cache_is_transparent() {
        let embedder = Arc::new(HashEmbedding::new(16));
        let store = Arc::new(InMemoryStore::new());
        store.create_collection("bio", 16).await;
        for (id, text) in [("1", "insulin signalling"), ("2", "actin filaments")] {
            store
                .insert(
                    "bio",
                    StoredPoint::new(id, embedder.embed_sync(text).unwrap(), Metadata::new()),
                )
                .await
                .unwrap();
        }

        let retriever = Retriever::new(embedder, store, "bio")
            .with_cache(EmbeddingCache::new(10, Duration::from_secs(60)));
        let query = SearchQuery::new("insulin").with_top_k(2);

        let first = retriever.search(&query).await.unwrap();
        let second = retriever.search(&query).await.unwrap();
        assert_eq!(first, second);

        let stats = retriever.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
