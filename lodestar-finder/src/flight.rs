//! Per-shard population serialization.
//!
//! A shard moves Cold -> Populating -> Warm; `Populating` must be held by
//! one task at a time per shard key, or N concurrent cold misses would run
//! N bulk loads. The registry hands out one async mutex per key.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-shard-key population locks.
#[derive(Debug, Default)]
pub(crate) struct PopulationLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PopulationLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the population lock for a shard key, creating it on first
    /// use. The guard releases on drop, including on a failed populate.
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_serializes() {
        let locks = Arc::new(PopulationLocks::new());
        let in_flight = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("catalogs").await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task should not panic");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_run_concurrently() {
        let locks = Arc::new(PopulationLocks::new());

        let first = locks.acquire("catalogs").await;

        // A different shard key must not block behind "catalogs".
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            locks.acquire("fields"),
        )
        .await;
        assert!(second.is_ok());

        drop(first);
    }
}
