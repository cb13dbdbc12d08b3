//! BioSemantica Core - Domain models, errors, and shared types
//!
//! This crate defines the abstractions shared across the BioSemantica workspace:
//! - Content types and the static content-type catalog
//! - Search queries, search results, and collection statistics
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LoggingConfig, RetrieverConfig,
    ServerConfig, VectorBackend, VectorStoreConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for retrieval operations
#[derive(Error, Debug)]
pub enum BioError {
    /// The retrieval core failed to initialize and cannot serve requests
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Dimension mismatch: collection expects {expected}, query vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Deadline exceeded, in milliseconds
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BioError>;

// ============================================================================
// Content Types
// ============================================================================

/// Modality classification of a stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Research papers and protocols
    Text,
    /// Images, embedded through their textual description
    Image,
    /// DNA, RNA, and protein sequences
    Sequence,
    /// Experimental records
    Experiment,
}

impl ContentType {
    /// All content types, in catalog order
    pub const ALL: [ContentType; 4] = [
        ContentType::Text,
        ContentType::Image,
        ContentType::Sequence,
        ContentType::Experiment,
    ];

    /// Payload value used for this content type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Sequence => "sequence",
            Self::Experiment => "experiment",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text (Papers & Protocols)",
            Self::Image => "Images",
            Self::Sequence => "Sequences",
            Self::Experiment => "Experiments",
        }
    }

    /// Short description shown to clients
    pub fn description(&self) -> &'static str {
        match self {
            Self::Text => "Research papers and experimental protocols",
            Self::Image => "Microscopy images and visualizations",
            Self::Sequence => "DNA, RNA, and protein sequences",
            Self::Experiment => "Experimental data and results",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = BioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "sequence" => Ok(Self::Sequence),
            "experiment" => Ok(Self::Experiment),
            other => Err(BioError::Validation(format!("Unknown content type: {other}"))),
        }
    }
}

/// Catalog entry describing one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeInfo {
    pub value: String,
    pub label: String,
    pub description: String,
}

impl From<ContentType> for ContentTypeInfo {
    fn from(content_type: ContentType) -> Self {
        Self {
            value: content_type.as_str().to_string(),
            label: content_type.label().to_string(),
            description: content_type.description().to_string(),
        }
    }
}

/// The static content-type catalog
pub fn content_type_catalog() -> Vec<ContentTypeInfo> {
    ContentType::ALL.into_iter().map(ContentTypeInfo::from).collect()
}

// ============================================================================
// Search Types
// ============================================================================

/// Content type reported for items whose payload lacks one
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// Free-form metadata attached to a stored item
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Search request handed to the retriever
///
/// The retriever does not validate any of these fields; empty queries and
/// `top_k == 0` pass straight through to the embedder and vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Natural-language query text
    pub query: String,

    /// Maximum number of results to return
    pub top_k: usize,

    /// Restrict results to one content type
    pub content_type: Option<String>,

    /// Restrict results to one publication year
    pub year: Option<i64>,
}

impl SearchQuery {
    /// Create a new unfiltered query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 10,
            content_type: None,
            year: None,
        }
    }

    /// Set top-k
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Filter by content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Filter by year
    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }
}

/// A single search hit, normalized from the stored payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stored item identifier
    pub id: String,

    /// Primary textual payload (possibly a chunk)
    pub content: String,

    /// Similarity score (higher is more relevant)
    pub score: f32,

    /// Free-form metadata, passed through verbatim
    pub metadata: Metadata,

    /// Content type, or `unknown` when the payload has none
    pub content_type: String,

    /// Parent-document link for chunked content
    pub chunk_id: Option<String>,

    /// Human-readable summary (image items)
    pub description: String,

    /// Unchunked original payload
    pub full_content: String,
}

/// Statistics about the searchable collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name
    pub collection_name: String,

    /// Total number of stored points
    pub total_points: u64,

    /// Collection status as reported by the store
    pub status: String,

    /// Configured vector dimensionality
    pub vector_dimension: usize,

    /// Content-type tally over the sampled payloads
    pub content_types: BTreeMap<String, u64>,

    /// Number of payloads the tally was computed over
    pub sampled_points: u64,

    /// True when the tally covers only part of the collection
    pub approximate: bool,
}

// ============================================================================
// Tests
// ============================================================================
