

pub mod base;
pub mod fallback;
pub mod groq;
pub mod ollama;

pub use base::{LlmProvider, LlmProviderError, Message, Prompt, PromptKind, Reply};
pub use fallback::LlmProviderWithFallback;
pub use groq::GroqProvider;
pub use ollama::OllamaProvider;
