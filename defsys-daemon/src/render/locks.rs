//! Per-key mutual exclusion for renders.
//!
//! Requests for the same cache key queue on one async mutex while different
//! keys proceed independently. Table entries are dropped once nobody holds
//! or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Table of async mutexes keyed by cache key.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Arc<Mutex<LockTable>>,
}

/// Held while a render for `key` is in progress.
pub struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockTable>>,
}

fn acquire(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Recovering from poisoned render lock table");
            poisoned.into_inner()
        }
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder of `key` remains, then hold it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut table = acquire(&self.table);
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = mutex.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            guard: Some(guard),
            table: Arc::clone(&self.table),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        acquire(&self.table).len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = acquire(&self.table);
        if table
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.key);
        }
    }
}
