//! The Aggregation Lock Manager (§4.G): a process-wide registry of mutexes
//! keyed by stringified aggregation key, acquired in sorted order so that
//! concurrent reconciles sharing a subset of keys never deadlock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::AggregationKey;

#[derive(Default)]
pub struct KeyedLockManager {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds every guard acquired by one `lock_many` call. Releases them in
/// reverse acquisition order on drop, on every exit path including panics.
pub struct MultiKeyGuard {
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for MultiKeyGuard {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl KeyedLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Sorts and dedupes `keys`, then acquires each lock in ascending order.
    pub async fn lock_many<I: IntoIterator<Item = String>>(&self, keys: I) -> MultiKeyGuard {
        let mut sorted: Vec<String> = keys.into_iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            let mutex = self.entry_for(&key);
            guards.push(mutex.lock_owned().await);
        }
        MultiKeyGuard { guards }
    }
}

/// The lock-manager keyspace string for one aggregation key.
pub fn aggregation_lock_key(key: &AggregationKey) -> String {
    format!("{}|{}|{}|{}", key.0, key.1, key.2, key.3)
}
