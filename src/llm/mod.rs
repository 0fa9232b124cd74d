pub mod assistant;
pub mod cache;
pub mod embeddings;
pub mod factory;
pub mod hashing;
#[cfg(feature = "onnx-embeddings")]
pub mod onnx;
pub mod providers;

pub use assistant::{AssistantError, ExplanationInput, MedicalAssistant};
pub use cache::{CacheStats, EmbeddingCache};
pub use embeddings::{Embedding, EmbeddingError, EmbeddingGenerator, EmbeddingProvider};
pub use factory::{EmbeddingProviderFactory, LlmProviderFactory};
pub use hashing::HashingEmbedder;
#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;
pub use providers::{
    GroqProvider, LlmProvider, LlmProviderError, LlmProviderWithFallback, OllamaProvider, Prompt, PromptKind, Reply,
};
