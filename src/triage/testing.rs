//! Deterministic embedders and classifiers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::classifier::{Classifier, ClassifierError};
use crate::llm::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};


/// Returns a fixed vector per known text and `default` otherwise.
pub(crate) struct FixtureEmbedder {
    pub vectors: HashMap<String, Embedding>,
    pub default: Embedding,
    pub loads: AtomicUsize,
    pub encodes: AtomicUsize,
    pub fail_load: bool,
    pub failing_texts: Vec<String>,
    pub load_delay: Duration,
}

impl FixtureEmbedder {
    pub fn new(vectors: &[(&str, &[f32])], default: &[f32]) -> Self {
        Self {
            vectors: vectors.iter().map(|(t, v)| (t.to_string(), v.to_vec())).collect(),
            default: default.to_vec(),
            loads: AtomicUsize::new(0),
            encodes: AtomicUsize::new(0),
            fail_load: false,
            failing_texts: Vec::new(),
            load_delay: Duration::ZERO,
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FixtureEmbedder {
    async fn load(&self) -> Result<(), EmbeddingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_load {
            return Err(EmbeddingError::Unavailable("fixture model missing".to_string()));
        }
        Ok(())
    }

    async fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        if self.failing_texts.iter().any(|t| t == text) {
            return Err(EmbeddingError::InvalidResponse("fixture failure".to_string()));
        }
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.default.clone()))
    }

    fn model_name(&self) -> &str {
        "fixture"
    }
}


/// Ignores its input and always returns the same distribution.
pub(crate) struct FixedClassifier {
    pub classes: Vec<String>,
    pub probabilities: Vec<f64>,
}

impl FixedClassifier {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            classes: pairs.iter().map(|(c, _)| c.to_string()).collect(),
            probabilities: pairs.iter().map(|(_, p)| *p).collect(),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, _embedding: &[f32]) -> Result<Vec<f64>, ClassifierError> {
        Ok(self.probabilities.clone())
    }
}


pub(crate) struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn classes(&self) -> &[String] {
        &[]
    }

    fn predict_proba(&self, _embedding: &[f32]) -> Result<Vec<f64>, ClassifierError> {
        Err(ClassifierError::NonFinite)
    }
}
