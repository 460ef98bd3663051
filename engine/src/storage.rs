//! The persistence medium behind the cache and the queue.
//!
//! Storage is a flat, synchronous string-to-string map. Implementations are
//! cheap handles: cloning one yields another view of the same data, so the
//! cache store and the queue can share a medium.

use crate::{error::Result, Error};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Synchronous key-value storage.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a value. Running out of room is `Error::StorageQuotaExceeded`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryInner {
    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// In-memory storage with an optional byte quota.
///
/// The quota counts key and value bytes, which is how browser local storage
/// accounts for its limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                entries: BTreeMap::new(),
                quota_bytes: Some(quota_bytes),
            })),
        }
    }

    /// Bytes currently in use.
    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // Every mutation is a single map call, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();

        if let Some(quota) = inner.quota_bytes {
            let existing = inner
                .entries
                .get(key)
                .map(|old| key.len() + old.len())
                .unwrap_or(0);
            let projected = inner.used_bytes() - existing + key.len() + value.len();
            if projected > quota {
                return Err(Error::StorageQuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().entries.keys().cloned().collect())
    }
}
