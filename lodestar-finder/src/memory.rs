//! In-memory cache store.
//!
//! The default store for single-process embedders and tests. Entries live
//! until tag invalidation or, when a TTL is configured, until they outlive
//! it. Uses `tokio::sync::RwLock` for safe async access.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lodestar_core::{FinderResult, StoreError, TagSet};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::store::{CacheStats, CacheStore, StoredEntry};

/// In-memory, tag-aware cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    /// Entries keyed by `(directory, shard)`.
    entries: RwLock<HashMap<(String, String), StoredEntry>>,
    stats: RwLock<CacheStats>,
    /// Maximum entry age; `None` means entries never expire by time.
    entry_ttl: Option<Duration>,
}

impl MemoryCacheStore {
    /// Create a store whose entries only expire through tag invalidation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose entries also expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entry_ttl: Some(ttl),
            ..Self::default()
        }
    }

    fn expired(&self, entry: &StoredEntry) -> bool {
        match self.entry_ttl {
            Some(ttl) => {
                let age = Utc::now()
                    .signed_duration_since(entry.cached_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age > ttl
            }
            None => false,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        directory: &str,
        shard: &str,
    ) -> FinderResult<Option<T>> {
        let key = (directory.to_string(), shard.to_string());
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        if entries.get(&key).is_some_and(|entry| self.expired(entry)) {
            entries.remove(&key);
            stats.misses += 1;
            stats.evictions += 1;
            return Ok(None);
        }

        match entries.get(&key) {
            Some(entry) => {
                stats.hits += 1;
                let value = serde_json::from_value(entry.value.clone()).map_err(|e| {
                    StoreError::Deserialization {
                        shard: shard.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(value))
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn put<T: Serialize + Send + Sync>(
        &self,
        directory: &str,
        shard: &str,
        value: &T,
        tags: &TagSet,
    ) -> FinderResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            shard: shard.to_string(),
            reason: e.to_string(),
        })?;
        let key = (directory.to_string(), shard.to_string());
        self.entries
            .write()
            .await
            .insert(key, StoredEntry::new(value, tags));
        Ok(())
    }

    async fn invalidate(&self, tags: &TagSet) -> FinderResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.matches(tags));
        let evicted = (before - entries.len()) as u64;
        self.stats.write().await.evictions += evicted;
        Ok(evicted)
    }

    async fn stats(&self) -> FinderResult<CacheStats> {
        let mut stats = self.stats.read().await.clone();
        stats.entry_count = self.entries.read().await.len() as u64;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> TagSet {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryCacheStore::new();
        store
            .put("dir", "catalogs", &vec![1, 2, 3], &tags(&["catalog_id_1"]))
            .await
            .expect("put should succeed");

        let value: Option<Vec<i64>> = store.get("dir", "catalogs").await.expect("get");
        assert_eq!(value, Some(vec![1, 2, 3]));

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_cold_shard_is_none() {
        let store = MemoryCacheStore::new();
        let value: Option<Vec<i64>> = store.get("dir", "catalogs").await.expect("get");
        assert!(value.is_none());
        assert_eq!(store.stats().await.expect("stats").misses, 1);
    }

    #[tokio::test]
    async fn test_invalidate_by_tag_only_expires_matching() {
        let store = MemoryCacheStore::new();
        store
            .put("dir", "catalogs", &1, &tags(&["catalog_id_5", "catalog_id_new"]))
            .await
            .expect("put");
        store
            .put("dir", "fields", &2, &tags(&["catalog_id_9"]))
            .await
            .expect("put");

        let evicted = store.invalidate(&tags(&["catalog_id_5"])).await.expect("invalidate");
        assert_eq!(evicted, 1);

        let cold: Option<i64> = store.get("dir", "catalogs").await.expect("get");
        assert!(cold.is_none());
        let warm: Option<i64> = store.get("dir", "fields").await.expect("get");
        assert_eq!(warm, Some(2));
    }

    #[tokio::test]
    async fn test_ttl_expires_entries() {
        let store = MemoryCacheStore::with_ttl(Duration::from_millis(5));
        store.put("dir", "catalogs", &1, &tags(&[])).await.expect("put");

        tokio::time::sleep(Duration::from_millis(20)).await;

        let value: Option<i64> = store.get("dir", "catalogs").await.expect("get");
        assert!(value.is_none());
        assert_eq!(store.stats().await.expect("stats").evictions, 1);
    }
}
