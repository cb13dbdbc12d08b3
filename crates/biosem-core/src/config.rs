//! BioSemantica Configuration Management
//!
//! Handles configuration from environment variables and TOML config files,
//! with defaults that match the reference deployment (CLIP ViT-B/32 + Qdrant).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "BIOSEM_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Vector index connection
    pub vector_store: VectorStoreConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// Retrieval pipeline configuration
    pub retriever: RetrieverConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration: optional TOML file named by `BIOSEM_CONFIG`,
    /// then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?.with_env_override(),
            Err(_) => Self::from_env(),
        }
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(port) = parse_var(&lookup, "API_PORT")? {
            self.server.port = port;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Vector store
        if let Some(backend) = parse_var(&lookup, "VECTOR_BACKEND")? {
            self.vector_store.backend = backend;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.vector_store.qdrant_url = url;
        }
        if let Some(key) = lookup("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(collection) = lookup("COLLECTION_NAME") {
            self.vector_store.collection = collection;
        }
        if let Some(secs) = parse_var(&lookup, "QDRANT_TIMEOUT_SECS")? {
            self.vector_store.timeout_secs = secs;
        }
        if let Some(limit) = parse_var(&lookup, "STATS_SAMPLE_LIMIT")? {
            self.vector_store.stats_sample_limit = limit;
        }
        if let Some(field) = lookup("YEAR_FIELD") {
            self.vector_store.year_field = field;
        }

        // Embedding
        if let Some(provider) = parse_var(&lookup, "EMBEDDING_PROVIDER")? {
            self.embedding.provider = provider;
        }
        if let Some(url) = lookup("EMBEDDING_URL") {
            self.embedding.endpoint_url = url;
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dimension) = parse_var(&lookup, "EMBEDDING_DIMENSION")? {
            self.embedding.dimension = dimension;
        }
        if let Some(dir) = lookup("CLIP_MODEL_DIR") {
            self.embedding.model_dir = PathBuf::from(dir);
        }

        // Retriever
        if let Some(k) = parse_var(&lookup, "DEFAULT_TOP_K")? {
            self.retriever.default_top_k = k;
        }
        if let Some(k) = parse_var(&lookup, "MAX_TOP_K")? {
            self.retriever.max_top_k = k;
        }
        if let Some(secs) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS")? {
            self.retriever.request_timeout_secs = secs;
        }
        if let Some(capacity) = parse_var::<u64, _>(&lookup, "EMBEDDING_CACHE_CAPACITY")? {
            self.retriever.cache_enabled = capacity > 0;
            self.retriever.cache_capacity = capacity;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_var(&lookup, "LOG_JSON")? {
            self.logging.json_format = json;
        }

        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_store.collection.trim().is_empty() {
            return Err(ConfigError::MissingRequired("COLLECTION_NAME".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EMBEDDING_DIMENSION".to_string(),
                value: "0".to_string(),
            });
        }
        if self.retriever.default_top_k == 0
            || self.retriever.default_top_k > self.retriever.max_top_k
        {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_TOP_K".to_string(),
                value: self.retriever.default_top_k.to_string(),
            });
        }
        // Qdrant scrolls take a u32 limit
        let sample_limit = self.vector_store.stats_sample_limit;
        if sample_limit == 0 || u32::try_from(sample_limit).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "STATS_SAMPLE_LIMIT".to_string(),
                value: sample_limit.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty allows any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![],
        }
    }
}

/// Which vector store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Qdrant,
    /// Process-local store for development and tests
    Memory,
}

impl FromStr for VectorBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Vector index connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Store implementation
    pub backend: VectorBackend,

    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant API key
    pub api_key: Option<String>,

    /// Collection holding the indexed items
    pub collection: String,

    /// Transport timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound on payloads scanned for content-type statistics
    pub stats_sample_limit: usize,

    /// Payload key holding the content type
    pub content_type_field: String,

    /// Payload key holding the year (dotted paths address nested fields)
    pub year_field: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            qdrant_url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "biology_multimodal".to_string(),
            timeout_secs: 30,
            stats_sample_limit: 1000,
            content_type_field: "content_type".to_string(),
            year_field: "year".to_string(),
        }
    }
}

/// Supported embedding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// HTTP inference service hosting the CLIP text encoder
    Remote,
    /// Local ONNX CLIP text encoder (requires the `onnx` feature)
    Onnx,
    /// Deterministic feature hashing, for development and tests
    Hash,
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "onnx" => Ok(Self::Onnx),
            "hash" => Ok(Self::Hash),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend to use
    pub provider: EmbeddingProvider,

    /// Model identifier
    pub model: String,

    /// Inference service base URL (remote provider)
    pub endpoint_url: String,

    /// Inference service API key (remote provider)
    pub api_key: Option<String>,

    /// Output dimensionality (CLIP ViT-B/32 projection = 512)
    pub dimension: usize,

    /// Maximum token context; longer inputs are truncated
    pub max_tokens: usize,

    /// Directory holding `text_model.onnx` and `tokenizer.json` (onnx provider)
    pub model_dir: PathBuf,

    /// Request timeout in seconds (remote provider)
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Remote,
            model: "openai/clip-vit-base-patch32".to_string(),
            endpoint_url: "http://localhost:8081".to_string(),
            api_key: None,
            dimension: 512,
            max_tokens: 77,
            model_dir: PathBuf::from("models/clip-vit-base-patch32"),
            timeout_secs: 30,
        }
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Results returned when the request does not say
    pub default_top_k: usize,

    /// Largest top_k the API accepts
    pub max_top_k: usize,

    /// Deadline for a single search or stats call, in seconds
    pub request_timeout_secs: u64,

    /// Cache query embeddings
    pub cache_enabled: bool,

    /// Maximum cached query embeddings
    pub cache_capacity: u64,

    /// Time-to-live for cached embeddings, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 100,
            request_timeout_secs: 30,
            cache_enabled: true,
            cache_capacity: 10_000,
            cache_ttl_secs: 3600,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::BioError {
    fn from(err: ConfigError) -> Self {
        crate::BioError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.vector_store.collection, "biology_multimodal");
        assert_eq!(config.vector_store.stats_sample_limit, 1000);
        assert_eq!(config.embedding.dimension, 512);
        assert_eq!(config.embedding.max_tokens, 77);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("PORT", "9000"),
                ("QDRANT_URL", "https://qdrant.example:6334"),
                ("QDRANT_API_KEY", "secret"),
                ("COLLECTION_NAME", "bio_test"),
                ("EMBEDDING_PROVIDER", "hash"),
                ("CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("EMBEDDING_CACHE_CAPACITY", "0"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.vector_store.qdrant_url, "https://qdrant.example:6334");
        assert_eq!(config.vector_store.api_key.as_deref(), Some("secret"));
        assert_eq!(config.vector_store.collection, "bio_test");
        assert_eq!(config.embedding.provider, EmbeddingProvider::Hash);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(!config.retriever.cache_enabled);
    }

    #[test]
    fn test_api_port_wins_over_port() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[("PORT", "9000"), ("API_PORT", "9100")]))
            .unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));

        let err = config
            .apply_overrides(lookup_from(&[("EMBEDDING_PROVIDER", "word2vec")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [vector_store]
            collection = "proteins"
            backend = "memory"

            [embedding]
            provider = "hash"
            dimension = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.vector_store.collection, "proteins");
        assert_eq!(config.vector_store.backend, VectorBackend::Memory);
        assert_eq!(config.embedding.dimension, 64);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retriever.default_top_k, 10);
    }

    #[test]
    fn test_validate_rejects_bad_top_k() {
        let mut config = AppConfig::default();
        config.retriever.default_top_k = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_sample_limit() {
        let mut config = AppConfig::default();
        config.vector_store.stats_sample_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "STATS_SAMPLE_LIMIT"
        ));

        config.vector_store.stats_sample_limit = u32::MAX as usize;
        assert!(config.validate().is_ok());

        #[cfg(target_pointer_width = "64")]
        {
            config.vector_store.stats_sample_limit = u32::MAX as usize + 1;
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "Remote".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::Remote
        );
        assert_eq!("onnx".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::Onnx);
        assert!("invalid".parse::<VectorBackend>().is_err());
    }
}
