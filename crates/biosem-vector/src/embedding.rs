//! Embedding clients for mapping query text into the shared CLIP space
//!
//! Every client returns L2-normalized vectors of a fixed dimension. Stored
//! items were normalized the same way at ingestion time, so mixing
//! normalized and raw vectors never reaches the similarity search.

use async_trait::async_trait;
use biosem_core::{BioError, EmbeddingConfig, EmbeddingProvider, Result};
use reqwest::Client;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| BioError::Embedding("No embedding returned".to_string()))
    }

    /// Generate embeddings for multiple texts, one vector per input in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Model identifier for logging
    fn model_name(&self) -> &str;
}

/// Scale a vector to unit Euclidean norm.
///
/// Fails on zero or non-finite input instead of emitting NaNs.
pub fn l2_normalize(vector: &[f32]) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm <= f32::EPSILON {
        return Err(BioError::Embedding(format!(
            "Cannot normalize degenerate embedding (norm = {norm})"
        )));
    }
    Ok(vector.iter().map(|x| x / norm).collect())
}

fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(BioError::Embedding(format!(
            "Model returned {} dimensions, expected {expected}",
            vector.len()
        )));
    }
    Ok(())
}

// ============================================================================
// Remote CLIP Inference Service
// ============================================================================

/// Client for an HTTP inference service hosting the CLIP text encoder.
///
/// Speaks the text-embeddings-inference `/embed` protocol: the service
/// truncates inputs to the model context and batches internally.
pub struct RemoteEmbedding {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

impl RemoteEmbedding {
    /// Create a new remote embedding client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BioError::Embedding(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            dimension,
        })
    }

    /// Set bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = Self::new(
            config.endpoint_url.clone(),
            config.model.clone(),
            config.dimension,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(match &config.api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }
}

#[async_trait]
impl EmbeddingClient for RemoteEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                inputs: texts,
                truncate: true,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BioError::Embedding(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BioError::Embedding(format!(
                "Embedding service returned {status}: {error_text}"
            )));
        }

        let raw: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| BioError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        if raw.len() != texts.len() {
            return Err(BioError::Embedding(format!(
                "Embedding service returned {} vectors for {} inputs",
                raw.len(),
                texts.len()
            )));
        }

        raw.iter()
            .map(|vector| {
                check_dimension(vector, self.dimension)?;
                l2_normalize(vector)
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Feature-Hashing Embedding
// ============================================================================

/// Deterministic bag-of-words embedding via signed feature hashing.
///
/// Lexical only: texts sharing tokens score higher, nothing more. Useful
/// for offline development and tests; a collection populated with CLIP
/// vectors must never be queried with it.
pub struct HashEmbedding {
    dimension: usize,
    max_tokens: usize,
}

/// Weight of the start/end markers present in every input, as in CLIP.
/// Markers are always added positively so the vector is never all zeros.
const MARKER_WEIGHT: f32 = 0.1;

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_tokens: 77,
        }
    }

    /// Limit the number of tokens considered; later tokens are dropped
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.dimension).with_max_tokens(config.max_tokens)
    }

    /// Synchronous embedding of one text
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        self.accumulate(&mut vector, "<|startoftext|>", MARKER_WEIGHT, false);
        let lowered = text.to_lowercase();
        // Two marker slots count against the context, as in CLIP
        let budget = self.max_tokens.saturating_sub(2);
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(budget)
        {
            self.accumulate(&mut vector, token, 1.0, true);
        }
        self.accumulate(&mut vector, "<|endoftext|>", MARKER_WEIGHT, false);

        l2_normalize(&vector)
    }

    fn accumulate(&self, vector: &mut [f32], token: &str, weight: f32, signed: bool) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let hash = hasher.finish();

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if signed && hash >> 63 == 1 { -1.0 } else { 1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_sync(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed_sync(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hash"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config.
///
/// Model weights are loaded here, once; a failure means the retrieval core
/// is unavailable.
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingClient>> {
    match config.provider {
        EmbeddingProvider::Remote => Ok(Arc::new(RemoteEmbedding::from_config(config)?)),
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedding::from_config(config))),
        #[cfg(feature = "onnx")]
        EmbeddingProvider::Onnx => Ok(Arc::new(crate::clip::ClipTextEmbedding::load(config)?)),
        #[cfg(not(feature = "onnx"))]
        EmbeddingProvider::Onnx => Err(BioError::Config(
            "The onnx embedding provider requires building with the `onnx` feature".to_string(),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
