//! Availability wrapper around the retriever
//!
//! Initialization never aborts the process. If the embedding model cannot be
//! loaded or reached, or the vector store client cannot be built, the
//! service comes up in an
//! unavailable state and every search or stats call returns
//! `BioError::Unavailable` with the original failure as the reason.

use crate::{CacheStatsReport, Retriever};
use biosem_core::{AppConfig, BioError, CollectionStats, Result, SearchQuery, SearchResult};
use biosem_vector::{create_embedding_client, create_vector_store};
use std::sync::Arc;

enum ServiceState {
    Ready(Arc<Retriever>),
    Unavailable { reason: String },
}

/// Search service shared by the HTTP server and the CLI
pub struct SearchService {
    state: ServiceState,
    collection: String,
}

impl SearchService {
    /// Build the embedder, vector store and retriever from config
    pub async fn initialize(config: &AppConfig) -> Self {
        let collection = config.vector_store.collection.clone();

        match Self::build_retriever(config).await {
            Ok(retriever) => {
                tracing::info!(
                    collection = %collection,
                    model = retriever.embedder().model_name(),
                    dimension = retriever.embedder().dimension(),
                    "Retriever initialized"
                );
                Self::ready(retriever)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize retriever");
                Self::unavailable(collection, e.to_string())
            }
        }
    }

    async fn build_retriever(config: &AppConfig) -> Result<Retriever> {
        let embedder = create_embedding_client(&config.embedding)?;

        // Remote models are only reachable once asked; embed once before serving
        let warmup = embedder.embed("").await?;
        if warmup.len() != config.embedding.dimension {
            return Err(BioError::Embedding(format!(
                "Model returned {} dimensions, expected {}",
                warmup.len(),
                config.embedding.dimension
            )));
        }
        tracing::debug!(model = embedder.model_name(), "Embedding model warmed up");

        let store = create_vector_store(&config.vector_store, config.embedding.dimension).await?;
        tracing::debug!(backend = store.name(), "Vector store client created");
        Ok(Retriever::from_config(config, embedder, store))
    }

    /// Wrap an already built retriever
    pub fn ready(retriever: Retriever) -> Self {
        let collection = retriever.collection().to_string();
        Self {
            state: ServiceState::Ready(Arc::new(retriever)),
            collection,
        }
    }

    /// A service that refuses every call
    pub fn unavailable(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Unavailable {
                reason: reason.into(),
            },
            collection: collection.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Why initialization failed, if it did
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(_) => None,
            ServiceState::Unavailable { reason } => Some(reason),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn retriever(&self) -> Result<&Arc<Retriever>> {
        match &self.state {
            ServiceState::Ready(retriever) => Ok(retriever),
            ServiceState::Unavailable { reason } => Err(BioError::Unavailable(reason.clone())),
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.retriever()?.search(query).await
    }

    pub async fn collection_info(&self) -> Result<CollectionStats> {
        self.retriever()?.collection_info().await
    }

    /// Ready only when initialized and both the model and the store answer
    pub async fn health_check(&self) -> Result<()> {
        self.retriever()?.health_check().await
    }

    pub fn cache_stats(&self) -> Option<CacheStatsReport> {
        self.retriever().ok().and_then(|r| r.cache_stats())
    }
}
