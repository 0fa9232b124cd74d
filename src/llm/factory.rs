use std::sync::Arc;

use tracing::{info, warn};

use super::embeddings::{EmbeddingError, EmbeddingGenerator, EmbeddingProvider};
use super::hashing::HashingEmbedder;
use super::providers::base::{LlmProvider, LlmProviderError};
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::groq::GroqProvider;
use super::providers::ollama::OllamaProvider;
use crate::core::config::{EmbeddingConfig, LlmConfig};


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// `onnx` and `hashing` run in-process; `ollama` and `openai` go through
    /// the remote generator.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        match config.provider.to_lowercase().as_str() {
            "onnx" => Ok(Self::onnx(config)),
            "hashing" => Ok(Self::hashing(config)),
            "ollama" | "openai" => Ok(Arc::new(EmbeddingGenerator::from_config(config)?)),
            other => Err(EmbeddingError::NotImplemented(format!(
                "{other}. Supported: onnx, hashing, ollama, openai"
            ))),
        }
    }

    fn hashing(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
        info!("Using offline hashing embedder (dims={})", config.hashing_dimension);
        Arc::new(HashingEmbedder::new(config.hashing_dimension))
    }

    #[cfg(feature = "onnx-embeddings")]
    fn onnx(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
        info!("Using in-process ONNX embedder from {}", config.model_dir.display());
        Arc::new(super::onnx::OnnxEmbedder::new(config.model_dir.clone()))
    }

    #[cfg(not(feature = "onnx-embeddings"))]
    fn onnx(config: &EmbeddingConfig) -> Arc<dyn EmbeddingProvider> {
        warn!("Built without the onnx-embeddings feature, using the hashing embedder");
        Self::hashing(config)
    }
}


pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// `Ok(None)` when no chat model is configured; the assistant endpoints
    /// then report themselves unavailable.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmProviderError> {
        let primary: Arc<dyn LlmProvider> = match config.provider.to_lowercase().as_str() {
            "" | "none" => return Ok(None),
            "groq" => {
                let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
                    warn!("GROQ_API_KEY not set, assistant disabled");
                    return Ok(None);
                };
                Arc::new(GroqProvider::new(
                    api_key,
                    config.base_url.clone(),
                    &config.model,
                    config.temperature,
                    config.max_tokens,
                    config.timeout_secs,
                )?)
            }
            "ollama" => Arc::new(OllamaProvider::new(
                config.base_url.as_deref().unwrap_or(crate::DEFAULT_OLLAMA_URL),
                &config.model,
                config.temperature,
                config.max_tokens,
                config.timeout_secs,
            )?),
            other => {
                return Err(LlmProviderError::Provider(format!(
                    "Unknown provider: {other}. Supported: groq, ollama"
                )));
            }
        };

        if !config.fallback_enabled {
            return Ok(Some(primary));
        }

        let fallback = Arc::new(OllamaProvider::new(
            &config.fallback_url,
            &config.fallback_model,
            config.temperature,
            config.max_tokens,
            config.timeout_secs,
        )?);
        Ok(Some(Arc::new(LlmProviderWithFallback::new(primary, fallback))))
    }
}
