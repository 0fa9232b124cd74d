use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::llm::embeddings::{Embedding, EmbeddingProvider};


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyMatch {
    pub phrase: String,
    /// Raw dot product between the query and phrase embeddings.
    pub similarity: f64,
    pub triggered: bool,
}


/// Reference emergency phrases embedded once at engine load.
#[derive(Debug, Clone)]
pub struct EmergencyDetector {
    phrases: Vec<String>,
    embeddings: Vec<Embedding>,
    threshold: f64,
}

impl EmergencyDetector {
    pub async fn build(phrases: &[String], threshold: f64, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let texts: Vec<&str> = phrases.iter().map(String::as_str).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.encode_batch(&texts).await?
        };

        info!("Emergency detector ready: phrases={}, threshold={}", phrases.len(), threshold);
        Ok(Self::from_embeddings(phrases.to_vec(), embeddings, threshold))
    }

    pub fn from_embeddings(phrases: Vec<String>, embeddings: Vec<Embedding>, threshold: f64) -> Self {
        Self {
            phrases,
            embeddings,
            threshold,
        }
    }

    /// Best-matching phrase for `query`. Phrases whose embedding length
    /// differs from the query are skipped; `None` when nothing comparable
    /// remains.
    pub fn best_match(&self, query: &[f32]) -> Option<EmergencyMatch> {
        let mut best: Option<(usize, f64)> = None;
        for (i, embedding) in self.embeddings.iter().enumerate() {
            if embedding.len() != query.len() {
                continue;
            }
            let score = dot(query, embedding);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        best.map(|(i, similarity)| {
            let triggered = exceeds(similarity, self.threshold);
            debug!("Emergency similarity {:.3} against '{}'", similarity, self.phrases[i]);
            EmergencyMatch {
                phrase: self.phrases[i].clone(),
                similarity,
                triggered,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}


/// Strict `score > threshold`, compared at the f32 precision scores are
/// computed in.
pub(crate) fn exceeds(score: f64, threshold: f64) -> bool {
    (score as f32) > (threshold as f32)
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    f64::from(a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>())
}
