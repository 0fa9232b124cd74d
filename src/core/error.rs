

use thiserror::Error;

use crate::llm::embeddings::EmbeddingError;
use crate::triage::classifier::ClassifierError;


#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge table is empty: {0}")]
    EmptyKnowledgeTable(&'static str),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TriageError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, TriageError>;
