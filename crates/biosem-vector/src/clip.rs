//! Local CLIP text encoder on ONNX Runtime
//!
//! Expects an exported `CLIPTextModelWithProjection` (`text_model.onnx`,
//! output `text_embeds`) and the matching `tokenizer.json` in the model
//! directory. Inputs are truncated to the model context (77 tokens for
//! ViT-B/32) and padded to the longest member of each batch.

use crate::embedding::{l2_normalize, EmbeddingClient};
use async_trait::async_trait;
use biosem_core::{BioError, EmbeddingConfig, Result};
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

pub const TEXT_MODEL_FILE: &str = "text_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

const END_OF_TEXT: &str = "<|endoftext|>";
const END_OF_TEXT_ID: u32 = 49407;

/// CLIP text encoder loaded once at startup
pub struct ClipTextEmbedding {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model: String,
    dimension: usize,
}

impl ClipTextEmbedding {
    /// Load model weights and tokenizer from `config.model_dir`
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let tokenizer = load_tokenizer(&config.model_dir.join(TOKENIZER_FILE), config.max_tokens)?;

        let model_path = config.model_dir.join(TEXT_MODEL_FILE);
        if !model_path.exists() {
            return Err(BioError::Embedding(format!(
                "CLIP text model not found at {}",
                model_path.display()
            )));
        }

        tracing::debug!(path = %model_path.display(), "Loading CLIP text model");
        let session = Session::builder()
            .map_err(|e| BioError::Embedding(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| BioError::Embedding(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e| BioError::Embedding(format!("Failed to load text model: {e}")))?;

        tracing::info!(
            model = %config.model,
            dimension = config.dimension,
            max_tokens = config.max_tokens,
            "CLIP text model loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

fn load_tokenizer(path: &Path, max_tokens: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
        BioError::Embedding(format!("Failed to load tokenizer {}: {e}", path.display()))
    })?;

    // Pad with the end-of-text id: the pooled position is the first
    // occurrence of the highest id, which stays on the real EOS token.
    let pad_id = tokenizer.token_to_id(END_OF_TEXT).unwrap_or(END_OF_TEXT_ID);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        direction: PaddingDirection::Right,
        pad_to_multiple_of: None,
        pad_id,
        pad_type_id: 0,
        pad_token: END_OF_TEXT.to_string(),
    }));

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_tokens,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
            direction: TruncationDirection::Right,
        }))
        .map_err(|e| BioError::Embedding(format!("Failed to apply truncation config: {e}")))?;

    Ok(tokenizer)
}

fn encode(
    session: &mut Session,
    tokenizer: &Tokenizer,
    texts: Vec<String>,
    dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let encodings = tokenizer
        .encode_batch(texts, true)
        .map_err(|e| BioError::Embedding(format!("Tokenization failed: {e}")))?;

    let batch = encodings.len();
    let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for encoding in &encodings {
        ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
        mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
    }

    let ids = Array2::from_shape_vec((batch, seq_len), ids)
        .map_err(|e| BioError::Embedding(e.to_string()))?;
    let mask = Array2::from_shape_vec((batch, seq_len), mask)
        .map_err(|e| BioError::Embedding(e.to_string()))?;

    let takes_mask = session.inputs.iter().any(|i| i.name == "attention_mask");
    let output_name = session
        .outputs
        .iter()
        .find(|o| o.name == "text_embeds")
        .or_else(|| session.outputs.first())
        .map(|o| o.name.clone())
        .ok_or_else(|| BioError::Embedding("Text model declares no outputs".to_string()))?;

    let ids_tensor = Tensor::from_array(ids)
        .map_err(|e| BioError::Embedding(format!("Failed to create input_ids tensor: {e}")))?;

    let outputs = if takes_mask {
        let mask_tensor = Tensor::from_array(mask).map_err(|e| {
            BioError::Embedding(format!("Failed to create attention_mask tensor: {e}"))
        })?;
        session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor
        ])
    } else {
        session.run(ort::inputs!["input_ids" => ids_tensor])
    }
    .map_err(|e| BioError::Embedding(format!("Text inference failed: {e}")))?;

    let output = outputs
        .get(&output_name)
        .ok_or_else(|| BioError::Embedding(format!("No output '{output_name}' from text model")))?;
    let (_shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| BioError::Embedding(format!("Failed to extract embeddings: {e}")))?;

    if data.len() != batch * dimension {
        return Err(BioError::Embedding(format!(
            "Text model returned {} values for {batch} inputs of dimension {dimension}",
            data.len()
        )));
    }

    data.chunks(dimension).map(l2_normalize).collect()
}

#[async_trait]
impl EmbeddingClient for ClipTextEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();
        let dimension = self.dimension;

        tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|_| BioError::Embedding("CLIP session lock poisoned".to_string()))?;
            encode(&mut session, &tokenizer, texts, dimension)
        })
        .await
        .map_err(|e| BioError::Embedding(format!("Inference task failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_dir_fails_cleanly() {
        let config = EmbeddingConfig {
            model_dir: std::env::temp_dir().join("biosem-missing-clip-model"),
            ..Default::default()
        };

        let err = ClipTextEmbedding::load(&config).err().unwrap();
        assert!(matches!(err, BioError::Embedding(_)));
    }
}
