use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, EmbeddingCache};
use crate::core::config::EmbeddingConfig;

/// Fixed-length vector representation of a text.
pub type Embedding = Vec<f32>;


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}


#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One-time heavy initialisation (model load, availability probe).
    async fn load(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }

    async fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.encode(text).await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

const PROBE_TEXT: &str = "fever and headache";


/// Remote embedding provider backed by Ollama or an OpenAI-compatible API.
pub struct EmbeddingGenerator {
    provider: String,
    url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    cache: EmbeddingCache,

    fallback_enabled: bool,
    fallback_url: String,
    fallback_model: String,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    dimension: AtomicUsize,
}

impl EmbeddingGenerator {

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let provider = config.provider.to_lowercase();

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            provider, config.model, config.cache_size
        );

        Ok(Self {
            provider,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            cache: EmbeddingCache::new(config.cache_size, config.cache_ttl_secs),
            fallback_enabled: config.fallback_enabled,
            fallback_url: config.fallback_url.trim_end_matches('/').to_string(),
            fallback_model: config.fallback_model.clone(),
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            dimension: AtomicUsize::new(0),
        })
    }


    pub async fn generate(&self, text: &str, use_cache: bool) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        if use_cache {
            if let Some(cached) = self.cache.get(text) {
                debug!("Cache HIT for: {}...", crate::safe_truncate(text, 50));
                return Ok(cached);
            }
        }

        let result = match self.provider.as_str() {
            "ollama" => self.generate_ollama(&self.url, &self.model, text).await,
            "openai" => self.generate_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        let embedding = match result {
            Ok(embedding) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                embedding
            }
            Err(e) if self.fallback_enabled && self.provider != "ollama" => {
                debug!("Primary embedding provider unavailable, trying fallback: {}", e);
                self.fallback_to_ollama(text, &e).await?
            }
            Err(e) => return Err(e),
        };

        self.check_dimension(&embedding)?;
        if use_cache {
            self.cache.set(text, embedding.clone());
        }
        Ok(embedding)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), EmbeddingError> {
        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }
        let expected = self.dimension.load(Ordering::SeqCst);
        if expected != 0 && expected != embedding.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "dimension changed from {} to {}",
                expected,
                embedding.len()
            )));
        }
        Ok(())
    }

    async fn generate_ollama(&self, url: &str, model: &str, text: &str) -> Result<Embedding, EmbeddingError> {
        let request = OllamaEmbeddingRequest { model, prompt: text };

        let response = self
            .client
            .post(format!("{}/api/embeddings", url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAIEmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    async fn fallback_to_ollama(
        &self,
        text: &str,
        original_error: &EmbeddingError,
    ) -> Result<Embedding, EmbeddingError> {
        info!(
            "Using fallback Ollama ({}/{}) - primary unavailable",
            self.fallback_url, self.fallback_model
        );

        let embedding = self
            .generate_ollama(&self.fallback_url, &self.fallback_model, text)
            .await
            .map_err(|e| EmbeddingError::BothFailed(original_error.to_string(), e.to_string()))?;

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        info!(
            "Fallback successful! dims={}, total_fallbacks={}",
            embedding.len(),
            self.fallback_count.load(Ordering::SeqCst)
        );

        Ok(embedding)
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }

    /// Zero until `load` has probed the model.
    pub fn dimension(&self) -> usize {
        self.dimension.load(Ordering::SeqCst)
    }


    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }


    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Embedding cache cleared");
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingGenerator {
    async fn load(&self) -> Result<(), EmbeddingError> {
        let probe = self.generate(PROBE_TEXT, false).await.map_err(|e| {
            warn!("Embedding model {} failed its availability probe: {}", self.model, e);
            EmbeddingError::Unavailable(e.to_string())
        })?;
        self.dimension.store(probe.len(), Ordering::SeqCst);
        info!("Embedding model {} ready (dims={})", self.model, probe.len());
        Ok(())
    }

    async fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.generate(text, true).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
