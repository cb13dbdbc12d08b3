//! Qdrant implementation of the vector store
//!
//! Issues filtered nearest-neighbor queries and collection introspection
//! against a remote Qdrant instance. Every transport or service failure is
//! mapped into `BioError::VectorStore`.

use crate::filter::{lookup_path, FilterValue, SearchFilter};
use crate::{ScoredPoint, VectorStore};
use async_trait::async_trait;
use biosem_core::{BioError, CollectionStats, Metadata, Result, VectorStoreConfig};
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_config, Condition, Filter, PointId,
    ScrollPointsBuilder, SearchPointsBuilder, Value as QdrantValue,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Qdrant vector store implementation
pub struct QdrantStore {
    client: Qdrant,
    content_type_field: String,
    stats_sample_limit: usize,
    /// Configured dimension, fetched once per collection on first use
    dimensions: tokio::sync::Mutex<HashMap<String, std::sync::Arc<OnceCell<usize>>>>,
}

impl QdrantStore {
    /// Create a new Qdrant client; no connection is made until the first call
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.qdrant_url)
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| BioError::VectorStore(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            content_type_field: config.content_type_field.clone(),
            stats_sample_limit: config.stats_sample_limit,
            dimensions: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Configured vector dimension of a collection
    pub async fn collection_dimension(&self, collection: &str) -> Result<usize> {
        let cell = {
            let mut dimensions = self.dimensions.lock().await;
            dimensions
                .entry(collection.to_string())
                .or_default()
                .clone()
        };

        cell.get_or_try_init(|| async {
            let info = self.client.collection_info(collection).await.map_err(|e| {
                BioError::VectorStore(format!("Failed to get collection {collection}: {e}"))
            })?;
            info.result
                .as_ref()
                .and_then(configured_dimension)
                .ok_or_else(|| {
                    BioError::VectorStore(format!(
                        "Collection {collection} has no single-vector configuration"
                    ))
                })
        })
        .await
        .copied()
    }
}

fn configured_dimension(info: &qdrant_client::qdrant::CollectionInfo) -> Option<usize> {
    let vectors = info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
    match vectors.config.as_ref()? {
        vectors_config::Config::Params(params) => Some(params.size as usize),
        vectors_config::Config::ParamsMap(map) => {
            map.map.values().next().map(|params| params.size as usize)
        }
    }
}

/// Translate a search filter into a Qdrant filter
pub fn to_qdrant_filter(filter: &SearchFilter) -> Option<Filter> {
    match filter {
        SearchFilter::None => None,
        SearchFilter::All(conditions) => Some(Filter::must(conditions.iter().map(|c| {
            match &c.value {
                FilterValue::Keyword(value) => Condition::matches(c.key.clone(), value.clone()),
                FilterValue::Integer(value) => Condition::matches(c.key.clone(), *value),
            }
        }))),
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(num)) => num.to_string(),
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        None => String::new(),
    }
}

fn qdrant_value_to_json(value: QdrantValue) -> Value {
    match value.kind {
        Some(Kind::NullValue(_)) | None => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(object)) => Value::Object(
            object
                .fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert a Qdrant payload into a JSON object
pub fn payload_to_json(payload: HashMap<String, QdrantValue>) -> Metadata {
    payload
        .into_iter()
        .map(|(k, v)| (k, qdrant_value_to_json(v)))
        .collect()
}

/// Count payloads per content type; dotted keys address nested objects
fn tally_content_types(
    payloads: impl IntoIterator<Item = Metadata>,
    content_type_field: &str,
) -> BTreeMap<String, u64> {
    let mut content_types = BTreeMap::new();
    for payload in payloads {
        let content_type = match lookup_path(&payload, content_type_field) {
            Some(Value::String(s)) => s.clone(),
            _ => biosem_core::UNKNOWN_CONTENT_TYPE.to_string(),
        };
        *content_types.entry(content_type).or_insert(0u64) += 1;
    }
    content_types
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn similarity_search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredPoint>> {
        let expected = self.collection_dimension(collection).await?;
        if query_vector.len() != expected {
            return Err(BioError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut request =
            SearchPointsBuilder::new(collection, query_vector.to_vec(), limit as u64)
                .with_payload(true);
        if let Some(filter) = to_qdrant_filter(filter) {
            request = request.filter(filter);
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| BioError::VectorStore(format!("Vector search failed: {e}")))?;

        tracing::debug!(
            collection,
            hits = response.result.len(),
            "Qdrant search completed"
        );

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point_id_to_string(point.id),
                score: point.score,
                payload: payload_to_json(point.payload),
            })
            .collect())
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| BioError::VectorStore(format!("Failed to get collection info: {e}")))?
            .result
            .ok_or_else(|| {
                BioError::VectorStore(format!("Collection {collection} returned no info"))
            })?;

        let total_points = info.points_count.unwrap_or(0);
        let status = info.status().as_str_name().to_lowercase();
        let vector_dimension = configured_dimension(&info).unwrap_or(0);

        // Bounded scan: the tally is exact only when the sample covers the collection
        let scroll = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .limit(u32::try_from(self.stats_sample_limit).unwrap_or(u32::MAX))
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| BioError::VectorStore(format!("Failed to scroll collection: {e}")))?;

        let sampled_points = scroll.result.len() as u64;
        let content_types = tally_content_types(
            scroll
                .result
                .into_iter()
                .map(|point| payload_to_json(point.payload)),
            &self.content_type_field,
        );

        Ok(CollectionStats {
            collection_name: collection.to_string(),
            total_points,
            status,
            vector_dimension,
            content_types,
            sampled_points,
            approximate: sampled_points < total_points,
        })
    }

    async fn health_check(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .map(|_| ())
            .map_err(|e| BioError::VectorStore(format!("Qdrant health check failed: {e}")))
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
