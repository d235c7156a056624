//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) so warm shards survive
//! process restarts. Entries are JSON-encoded [`StoredEntry`] envelopes;
//! tag invalidation scans the (small) entry set, since a finder family
//! holds one entry per shard, not one per record.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses read transactions for
//! `get` and write transactions for `put` and `invalidate`; statistics are
//! tracked under a `std::sync::RwLock`.

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use lodestar_core::{FinderResult, StoreError, TagSet};
use serde::{de::DeserializeOwned, Serialize};

use crate::store::{CacheStats, CacheStore, StoredEntry};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for lodestar_core::FinderError {
    fn from(e: LmdbStoreError) -> Self {
        StoreError::Unavailable {
            reason: e.to_string(),
        }
        .into()
    }
}

/// LMDB-backed, tag-aware cache store.
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    stats: RwLock<CacheStats>,
}

impl LmdbCacheStore {
    /// Open (or create) an LMDB store under `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files are stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    fn entry_key(directory: &str, shard: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(directory.len() + shard.len() + 1);
        key.extend_from_slice(directory.as_bytes());
        key.push(0x00);
        key.extend_from_slice(shard.as_bytes());
        key
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    /// Collect keys of entries expired by any of the given tags.
    fn collect_tagged_keys(&self, tags: &TagSet) -> Result<Vec<Vec<u8>>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        for result in iter {
            let (key, bytes) = result.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            match serde_json::from_slice::<StoredEntry>(bytes) {
                Ok(entry) if entry.matches(tags) => keys.push(key.to_vec()),
                // An undecodable entry can never be invalidated by tag;
                // drop it along with the matches.
                Err(_) => keys.push(key.to_vec()),
                Ok(_) => {}
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        directory: &str,
        shard: &str,
    ) -> FinderResult<Option<T>> {
        let key = Self::entry_key(directory, shard);

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, &key) {
            Ok(Some(bytes)) => {
                self.record_hit();
                let entry: StoredEntry =
                    serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization {
                        shard: shard.to_string(),
                        reason: e.to_string(),
                    })?;
                let value = serde_json::from_value(entry.value).map_err(|e| {
                    StoreError::Deserialization {
                        shard: shard.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(value))
            }
            Ok(None) => {
                self.record_miss();
                Ok(None)
            }
            Err(e) => {
                self.record_miss();
                Err(LmdbStoreError::Transaction(e.to_string()).into())
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
        let key = Self::entry_key(directory, shard);

        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            shard: shard.to_string(),
            reason: e.to_string(),
        })?;
        let entry = StoredEntry::new(value, tags);
        let bytes = serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization {
            shard: shard.to_string(),
            reason: e.to_string(),
        })?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, &key, &bytes)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn invalidate(&self, tags: &TagSet) -> FinderResult<u64> {
        let keys = self.collect_tagged_keys(tags)?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut evicted = 0u64;
        for key in &keys {
            let deleted = self
                .db
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            if deleted {
                evicted += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        if let Ok(mut stats) = self.stats.write() {
            stats.evictions += evicted;
        }

        Ok(evicted)
    }

    async fn stats(&self) -> FinderResult<CacheStats> {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        stats.entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(stats)
    }
}
