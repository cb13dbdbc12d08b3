//! In-process vector store
//!
//! Brute-force cosine search over points held in memory. Used for local
//! development and as the backend for integration tests; it honors the same
//! contract as the Qdrant adapter (ordering, limit, filter, dimension check).

use crate::filter::{lookup_path, SearchFilter};
use crate::{ScoredPoint, VectorStore};
use async_trait::async_trait;
use biosem_core::{BioError, CollectionStats, Metadata, Result, VectorStoreConfig};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// A point stored in the in-memory index
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Metadata,
}

impl StoredPoint {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, payload: Metadata) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

struct MemoryCollection {
    dimension: usize,
    points: Vec<StoredPoint>,
}

/// In-memory vector store
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    content_type_field: String,
    stats_sample_limit: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(&VectorStoreConfig::default())
    }

    pub fn with_config(config: &VectorStoreConfig) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            content_type_field: config.content_type_field.clone(),
            stats_sample_limit: config.stats_sample_limit,
        }
    }

    /// Create (or reset) a collection with a fixed dimension
    pub async fn create_collection(&self, name: &str, dimension: usize) {
        self.collections.write().await.insert(
            name.to_string(),
            MemoryCollection {
                dimension,
                points: Vec::new(),
            },
        );
    }

    /// Insert a point, replacing any point with the same id
    pub async fn insert(&self, collection: &str, point: StoredPoint) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| BioError::VectorStore(format!("Collection {collection} not found")))?;

        if point.vector.len() != target.dimension {
            return Err(BioError::DimensionMismatch {
                expected: target.dimension,
                actual: point.vector.len(),
            });
        }

        target.points.retain(|p| p.id != point.id);
        target.points.push(point);
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| BioError::VectorStore(format!("Collection {collection} not found")))?;

        if query_vector.len() != target.dimension {
            return Err(BioError::DimensionMismatch {
                expected: target.dimension,
                actual: query_vector.len(),
            });
        }

        let mut hits: Vec<ScoredPoint> = target
            .points
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(query_vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| BioError::VectorStore(format!("Collection {collection} not found")))?;

        let mut content_types = BTreeMap::new();
        let sample = target.points.iter().take(self.stats_sample_limit);
        for point in sample {
            let content_type = lookup_path(&point.payload, &self.content_type_field)
                .and_then(|v| v.as_str())
                .unwrap_or(biosem_core::UNKNOWN_CONTENT_TYPE);
            *content_types.entry(content_type.to_string()).or_insert(0u64) += 1;
        }

        let total_points = target.points.len() as u64;
        let sampled_points = total_points.min(self.stats_sample_limit as u64);

        Ok(CollectionStats {
            collection_name: collection.to_string(),
            total_points,
            status: "green".to_string(),
            vector_dimension: target.dimension,
            content_types,
            sampled_points,
            approximate: sampled_points < total_points,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
