//! BioSemantica Vector - Embedding and vector database abstraction
//!
//! Provides the embedding backends that map query text into the shared
//! CLIP space, the filter builder, and the vector store adapters (Qdrant
//! and an in-process store) that execute filtered similarity search.

use async_trait::async_trait;
use biosem_core::{CollectionStats, Metadata, Result, VectorBackend, VectorStoreConfig};
use std::sync::Arc;

pub mod embedding;
pub mod filter;
pub mod memory_store;
pub mod qdrant_store;

#[cfg(feature = "onnx")]
pub mod clip;

pub use embedding::{create_embedding_client, l2_normalize, EmbeddingClient, HashEmbedding};
pub use filter::{lookup_path, FieldCondition, FilterBuilder, FilterValue, SearchFilter};
pub use memory_store::{InMemoryStore, StoredPoint};
pub use qdrant_store::QdrantStore;

/// A raw hit returned by a vector store, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    /// Point identifier rendered as a string
    pub id: String,

    /// Similarity score (higher is more relevant)
    pub score: f32,

    /// Stored payload converted to JSON
    pub payload: Metadata,
}

/// Trait for vector index operations used by the retriever
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest-neighbor search, ordered by descending score, at most `limit` hits
    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPoint>>;

    /// Point count, status, dimension, and a sampled content-type tally
    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats>;

    /// Check that the store is reachable
    async fn health_check(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Create a vector store from config
///
/// The memory backend starts with an empty collection of the given dimension;
/// Qdrant collections are expected to exist already.
pub async fn create_vector_store(
    config: &VectorStoreConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        VectorBackend::Qdrant => Ok(Arc::new(QdrantStore::new(config)?)),
        VectorBackend::Memory => {
            let store = InMemoryStore::with_config(config);
            store.create_collection(&config.collection, dimension).await;
            Ok(Arc::new(store))
        }
    }
}
