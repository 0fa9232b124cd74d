use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::embeddings::Embedding;


pub struct EmbeddingCache {
    cache: Option<Mutex<LruCache<String, (Embedding, Instant)>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl EmbeddingCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, text: &str) -> Option<Embedding> {
        let cache = self.cache.as_ref()?;
        let key = Self::make_key(text);
        let mut cache = cache.lock();

        let lookup = cache
            .get(&key)
            .map(|(embedding, created_at)| (created_at.elapsed() < self.ttl).then(|| embedding.clone()));

        match lookup {
            Some(Some(embedding)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            Some(None) => {
                cache.pop(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, text: &str, embedding: Embedding) {
        if let Some(cache) = &self.cache {
            cache.lock().put(Self::make_key(text), (embedding, Instant::now()));
        }
    }

    fn make_key(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map(|c| c.lock().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
