//! Per-(topic, subject) memoization of verification reads.
//!
//! Each key maps to a shared once-cell: concurrent readers of the same key
//! wait on a single load. A failed load leaves the cell empty so the next
//! reader retries. Mutations evict the key and every descendant topic of
//! any subject before they are submitted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio::sync::OnceCell;

use crate::error::{VerificationError, Result};
use crate::ledger::Address;
use crate::topic::Topic;

/// Cache key: one topic of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub topic: Topic,
    pub subject: Address,
}

impl CacheKey {
    pub fn new(topic: Topic, subject: Address) -> Self {
        Self { topic, subject }
    }
}

/// Single-flight cache of loaded values.
pub struct VerificationCache<V> {
    name: &'static str,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<V>>>>,
}

impl<V: Clone> VerificationCache<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, running `load` if no value is
    /// present and no other caller is loading it.
    pub async fn get_or_load<F, Fut>(&self, key: CacheKey, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = self
            .lock_entries()?
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let value = cell.get_or_try_init(load).await?;
        Ok(value.clone())
    }

    /// Drop `(topic, subject)` and every entry below `topic`, of any subject.
    pub fn evict(&self, topic: &Topic, subject: &Address) -> Result<usize> {
        let mut entries = self.lock_entries()?;
        let before = entries.len();
        entries.retain(|key, _| {
            let exact = key.topic == *topic && key.subject == *subject;
            !(exact || key.topic.is_descendant_of(topic))
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("{} cache: evicted {evicted} entries for {topic} of {subject}", self.name);
        }
        Ok(evicted)
    }

    pub fn clear(&self) -> Result<()> {
        self.lock_entries()?.clear();
        Ok(())
    }

    /// Whether `key` holds a loaded value.
    pub fn is_loaded(&self, key: &CacheKey) -> bool {
        self.lock_entries()
            .map(|entries| entries.get(key).is_some_and(|cell| cell.initialized()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock_entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<CacheKey, Arc<OnceCell<V>>>>> {
        self.entries
            .lock()
            .map_err(|e| VerificationError::StorageError(format!("{} cache poisoned: {e}", self.name)))
    }
}
