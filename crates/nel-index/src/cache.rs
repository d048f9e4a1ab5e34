//! Caching searcher decorator
//!
//! Caches `find` and `get` results of any [`EntitySearcher`] using the moka
//! crate for thread-safe, async-compatible caching with TTL support.
//! Failed lookups are never cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use nel_core::{Entity, EntitySearcher, Result, SearchConfig};

/// Key for `find` cache entries
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FindKey {
    tokens: Vec<String>,
    language: String,
    limit: usize,
}

/// Searcher that caches the results of another searcher
pub struct CachingSearcher<S> {
    inner: S,
    found: Cache<FindKey, Vec<Entity>>,
    entities: Cache<String, Option<Entity>>,
    stats: Arc<CacheStats>,
}

impl<S: EntitySearcher> CachingSearcher<S> {
    /// Wrap a searcher using the capacity and TTL of the search settings
    pub fn new(inner: S, config: &SearchConfig) -> Self {
        Self::with_capacity(
            inner,
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn with_capacity(inner: S, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            found: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            entities: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Clear all cached results
    pub async fn clear(&self) {
        self.found.invalidate_all();
        self.entities.invalidate_all();
        self.found.run_pending_tasks().await;
        self.entities.run_pending_tasks().await;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: EntitySearcher> EntitySearcher for CachingSearcher<S> {
    async fn find(
        &self,
        query_tokens: &[String],
        language: &str,
        limit: usize,
    ) -> Result<Vec<Entity>> {
        let key = FindKey {
            tokens: query_tokens.to_vec(),
            language: language.to_string(),
            limit,
        };

        if let Some(cached) = self.found.get(&key).await {
            self.stats.record_hit();
            return Ok(cached);
        }
        self.stats.record_miss();

        let found = self.inner.find(query_tokens, language, limit).await?;
        self.found.insert(key, found.clone()).await;
        Ok(found)
    }

    async fn get(&self, id: &str) -> Result<Option<Entity>> {
        if let Some(cached) = self.entities.get(id).await {
            self.stats.record_hit();
            return Ok(cached);
        }
        self.stats.record_miss();

        let entity = self.inner.get(id).await?;
        self.entities.insert(id.to_string(), entity.clone()).await;
        Ok(entity)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Cache hit and miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Get a summary report
    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.hits(),
            misses: self.misses(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable cache statistics report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
}
