use serde::Serialize;
use tracing::info;

use crate::core::error::{Result, TriageError};
use crate::llm::embeddings::{Embedding, EmbeddingProvider};

/// Text that represents an entry inside a [`KnowledgeIndex`].
pub trait IndexText {
    fn index_text(&self) -> &str;
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}


/// Flat nearest-neighbour index. Entries and embeddings share positions and
/// keep insertion order; the index is never mutated after construction.
#[derive(Debug, Clone)]
pub struct KnowledgeIndex<T> {
    entries: Vec<T>,
    embeddings: Vec<Embedding>,
    dimension: usize,
}

impl<T: IndexText> KnowledgeIndex<T> {

    pub async fn build(entries: Vec<T>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        if entries.is_empty() {
            return Err(TriageError::EmptyKnowledgeTable("no entries to index"));
        }

        let texts: Vec<&str> = entries.iter().map(IndexText::index_text).collect();
        let embeddings = embedder.encode_batch(&texts).await?;

        let index = Self::from_embeddings(entries, embeddings)?;
        info!(
            "Knowledge index built: entries={}, dims={}, model={}",
            index.len(),
            index.dimension,
            embedder.model_name()
        );
        Ok(index)
    }
}

impl<T> KnowledgeIndex<T> {

    pub fn from_embeddings(entries: Vec<T>, embeddings: Vec<Embedding>) -> Result<Self> {
        if entries.is_empty() {
            return Err(TriageError::EmptyKnowledgeTable("no entries to index"));
        }
        if embeddings.len() != entries.len() {
            return Err(TriageError::Config(format!(
                "{} entries but {} embeddings",
                entries.len(),
                embeddings.len()
            )));
        }

        let dimension = embeddings[0].len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(TriageError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            entries,
            embeddings,
            dimension,
        })
    }

    /// Exact scan returning up to `k` neighbours by ascending squared L2
    /// distance. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(TriageError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, embedding)| Neighbor {
                position,
                distance: squared_l2(query, embedding),
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }


    pub fn get(&self, position: usize) -> Option<&T> {
        self.entries.get(position)
    }


    pub fn entries(&self) -> &[T] {
        &self.entries
    }


    pub fn len(&self) -> usize {
        self.entries.len()
    }


    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }


    pub fn dimension(&self) -> usize {
        self.dimension
    }
}


pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
