//! Local cache store: last-known-good server payload per scope.

use crate::{error::Result, CachedRecord, KeyValueStorage, ScopeKey, Timestamp};
use serde_json::Value;

/// Cached list payload.
pub type CachedList = CachedRecord<Vec<Value>>;

/// Durable per-scope cache over a [`KeyValueStorage`].
#[derive(Debug, Clone)]
pub struct CacheStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> CacheStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read the cached payload for a scope. Absent is `Ok(None)`.
    pub fn read(&self, scope: &ScopeKey) -> Result<Option<CachedList>> {
        let key = scope.storage_key();
        match self.storage.get(&key)? {
            Some(json) => CachedRecord::from_json(&key, &json).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite the cached payload for a scope.
    pub fn write(
        &self,
        scope: &ScopeKey,
        payload: Vec<Value>,
        saved_at: Timestamp,
    ) -> Result<CachedList> {
        let key = scope.storage_key();
        let record = CachedRecord::new(key.clone(), payload, saved_at);
        self.storage.set(&key, &record.to_json()?)?;
        Ok(record)
    }

    /// Remove the cached payload for a scope.
    pub fn clear(&self, scope: &ScopeKey) -> Result<()> {
        self.storage.remove(&scope.storage_key())
    }
}
