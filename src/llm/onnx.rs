//! In-process sentence embeddings: all-MiniLM-L6-v2 through ONNX Runtime,
//! mean-pooled over the attention mask and L2-normalised.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};

pub const MINILM_DIM: usize = 384;
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// MiniLM was trained on 256-token windows.
const MAX_TOKENS: usize = 256;


struct MiniLmModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl MiniLmModel {
    fn open(model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(EmbeddingError::Unavailable(format!("{} not found", path.display())));
            }
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::Unavailable(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| EmbeddingError::Unavailable(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::Unavailable(format!("ONNX load failed: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Unavailable(format!("Tokenizer load failed: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Unavailable(format!("Tokenizer setup failed: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn infer(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Tokenization failed: {e}")))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| i64::from(m)).collect();
        let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| i64::from(t)).collect();
        let seq_len = ids.len();

        let ids = ndarray::Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), mask.clone())
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let type_ids = ndarray::Array2::from_shape_vec((1, seq_len), type_ids)
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let ids_tensor =
            TensorRef::from_array_view(&ids).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let mask_tensor =
            TensorRef::from_array_view(&mask_array).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        let type_tensor =
            TensorRef::from_array_view(&type_ids).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
            .map_err(|e| EmbeddingError::InvalidResponse(format!("ONNX inference failed: {e}")))?;
        let (shape, hidden) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Output extraction failed: {e}")))?;

        if shape.len() != 3 || shape[2] as usize != MINILM_DIM {
            return Err(EmbeddingError::InvalidResponse(format!(
                "Unexpected output shape {shape:?}, expected [1, {seq_len}, {MINILM_DIM}]"
            )));
        }

        Ok(mean_pool(hidden, &mask, MINILM_DIM))
    }
}

/// Attention-masked mean over token rows of `hidden`, then L2-normalised.
pub fn mean_pool(hidden: &[f32], mask: &[i64], dim: usize) -> Embedding {
    let mut pooled = vec![0.0f32; dim];
    let mut weight = 0.0f32;

    for (token, &m) in mask.iter().enumerate() {
        let Some(row) = hidden.get(token * dim..(token + 1) * dim) else {
            break;
        };
        let m = m as f32;
        weight += m;
        for (p, h) in pooled.iter_mut().zip(row) {
            *p += h * m;
        }
    }

    if weight > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= weight);
    }

    let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= norm);
    }
    pooled
}


/// Embedder that runs the model on the blocking pool; no network access.
/// The session is opened once, on [`EmbeddingProvider::load`] or first use.
pub struct OnnxEmbedder {
    model_dir: PathBuf,
    model_name: String,
    model: OnceCell<Arc<MiniLmModel>>,
}

impl OnnxEmbedder {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        let model_name = model_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        Self {
            model_dir,
            model_name,
            model: OnceCell::new(),
        }
    }

    async fn model(&self) -> Result<Arc<MiniLmModel>, EmbeddingError> {
        self.model
            .get_or_try_init(|| async {
                let dir = self.model_dir.clone();
                let model = tokio::task::spawn_blocking(move || MiniLmModel::open(&dir))
                    .await
                    .map_err(|e| EmbeddingError::Unavailable(e.to_string()))??;
                info!("ONNX embedder loaded from {}", self.model_dir.display());
                Ok::<_, EmbeddingError>(Arc::new(model))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn load(&self) -> Result<(), EmbeddingError> {
        self.model().await.map(|_| ())
    }

    async fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let model = self.model().await?;
        let text = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || model.infer(&text))
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))??;

        debug!("ONNX embedding computed (dims={})", embedding.len());
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        let hidden = [1.0, 0.0, 3.0, 0.0, 100.0, 100.0];
        let pooled = mean_pool(&hidden, &[1, 1, 0], 2);
        assert_eq!(pooled, vec![1.0, 0.0]);
    }

    #[test]
    fn test_mean_pool_is_normalised() {
        let pooled = mean_pool(&[3.0, 4.0], &[1], 2);
        assert!((pooled[0] - 0.6).abs() < 1e-6);
        assert!((pooled[1] - 0.8).abs() < 1e-6);
        assert_eq!(mean_pool(&[0.0, 0.0], &[0], 2), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_missing_model_files_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = OnnxEmbedder::new(dir.path().join("all-MiniLM-L6-v2"));
        assert_eq!(embedder.model_name(), "all-MiniLM-L6-v2");

        let err = embedder.load().await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable(msg) if msg.contains(MODEL_FILE)));
        assert!(matches!(embedder.encode("   ").await, Err(EmbeddingError::EmptyText)));
    }
}
