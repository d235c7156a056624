//! Cache store trait and the stored-entry envelope.
//!
//! A [`CacheStore`] holds one entry per `(directory, shard)` pair. The
//! directory namespaces one finder family so different families never
//! collide; the shard names an independently invalidated partition within
//! the family. Entries carry the tag set registered during population, so
//! [`CacheStore::invalidate`] can expire exactly the shards a write affects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lodestar_core::{FinderResult, TagSet};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Envelope persisted by cache stores for one shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The serialized shard index.
    pub value: Value,
    /// Tags that expire this entry when emitted by a writer.
    pub tags: Vec<String>,
    /// When the shard was populated.
    pub cached_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Wrap a freshly built index with its tags.
    pub fn new(value: Value, tags: &TagSet) -> Self {
        let mut tags: Vec<String> = tags.iter().cloned().collect();
        tags.sort();
        Self {
            value,
            tags,
            cached_at: Utc::now(),
        }
    }

    /// Whether any of the given tags expire this entry.
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Cache store trait for pluggable shard storage.
///
/// Implementations must be thread-safe; a store is shared by every finder
/// of the family and by external writers emitting invalidation tags.
///
/// The store itself is dumb: it has no populate-on-miss semantics. The
/// coordinator serializes population per shard key, so implementations
/// only need atomic `put` visibility: a reader sees either no entry or a
/// fully written one, never a partial index.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a shard's cached index, or `None` when the shard is cold.
    async fn get<T: DeserializeOwned + Send>(
        &self,
        directory: &str,
        shard: &str,
    ) -> FinderResult<Option<T>>;

    /// Store a freshly populated shard index with its invalidation tags,
    /// replacing any previous entry wholesale.
    async fn put<T: Serialize + Send + Sync>(
        &self,
        directory: &str,
        shard: &str,
        value: &T,
        tags: &TagSet,
    ) -> FinderResult<()>;

    /// Expire every entry carrying any of the given tags.
    ///
    /// Returns the number of entries evicted. Expired shards are cold; the
    /// next read repopulates them.
    async fn invalidate(&self, tags: &TagSet) -> FinderResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> FinderResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in the store.
    pub entry_count: u64,
    /// Number of entries evicted by tag invalidation or TTL expiry.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
