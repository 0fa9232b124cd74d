use std::collections::HashSet;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"[a-z0-9]+").expect("valid token pattern");
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "and", "the", "of", "to", "in", "on", "with", "for", "or", "my", "i", "is",
        "are", "have", "has", "including", "related",
    ]
    .into_iter()
    .collect();
}

const BIGRAM_WEIGHT: f32 = 0.5;


/// Offline embedding provider: signed feature hashing of word unigrams and
/// bigrams, L2-normalised. Lexical rather than semantic, but deterministic
/// and dependency-free at runtime.
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            name: format!("hashing-{}", dimension.max(1)),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn tokens(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !STOP_WORDS.contains(t))
            .map(str::to_string)
            .collect()
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    fn embed(&self, text: &str) -> Embedding {
        let tokens = Self::tokens(text);
        let mut vector = vec![0.0f32; self.dimension];

        for token in &tokens {
            let (index, sign) = self.bucket(token);
            vector[index] += sign;
        }
        for pair in tokens.windows(2) {
            let (index, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[index] += sign * BIGRAM_WEIGHT;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(crate::DEFAULT_EMBEDDING_DIM)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        Ok(self.embed(text))
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_encoding_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(128);
        let first = embedder.encode("Chest pain radiating to left arm").await.unwrap();
        let second = embedder.encode("chest PAIN radiating to left arm").await.unwrap();

        assert_eq!(first.len(), 128);
        assert_eq!(first, second);
        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.encode("skin rash and itching").await.unwrap();
        let related = embedder.encode("Skin rash with itching and redness").await.unwrap();
        let unrelated = embedder.encode("Frequent urination and burning sensation").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
        assert!(dot(&query, &related) > 0.5);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let embedder = HashingEmbedder::default();
        assert!(matches!(embedder.encode("  ").await, Err(EmbeddingError::EmptyText)));
    }

    #[tokio::test]
    async fn test_stop_words_only_gives_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let vector = embedder.encode("and the of").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single_encoding() {
        let embedder = HashingEmbedder::new(64);
        let batch = embedder.encode_batch(&["fever", "cough"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.encode("cough").await.unwrap());
    }
}
