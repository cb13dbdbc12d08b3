//! Query-embedding cache
//!
//! Repeated queries skip the embedding model. Entries are the normalized
//! vectors the embedder produced, so a cached search is identical to an
//! uncached one.
//!
//! Uses the moka crate for a bounded, TTL-expiring async cache.

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache for query embeddings
#[derive(Clone)]
pub struct EmbeddingCache {
    cache: Cache<u64, Arc<Vec<f32>>>,
    stats: Arc<CacheStats>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` vectors for `ttl`
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Look up the embedding of `text`
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let result = self.cache.get(&hash_text(text)).await;

        if result.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }

        result.map(|v| v.as_ref().clone())
    }

    /// Store the embedding of `text`
    pub async fn put(&self, text: &str, embedding: Vec<f32>) {
        self.cache
            .insert(hash_text(text), Arc::new(embedding))
            .await;
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Current number of entries (eventually consistent)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Snapshot of the counters
    pub fn report(&self) -> CacheStatsReport {
        self.stats.report(self.entry_count())
    }
}

/// Hit/miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    fn report(&self, entries: u64) -> CacheStatsReport {
        CacheStatsReport {
            entries,
            hits: self.hits(),
            misses: self.misses(),
            writes: self.writes(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub hit_rate: f64,
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
