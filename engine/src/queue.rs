//! Pending operation queue.
//!
//! Each scope has one ordered queue, persisted as a JSON array under the
//! scope's pending key. Order is insertion order and survives restarts.
//! Items leave the queue from the front only, one confirmed operation at a
//! time, or all at once through [`PendingQueue::drain`].
//!
//! Mutations read, modify and rewrite the stored array. Clones of a queue
//! share one lock, so mutations through any of them never interleave.

use crate::{error::Result, Error, KeyValueStorage, PendingOperation, ScopeKey};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Durable per-scope FIFO of unconfirmed writes.
#[derive(Debug, Clone)]
pub struct PendingQueue<S> {
    storage: S,
    lock: Arc<Mutex<()>>,
}

impl<S: KeyValueStorage> PendingQueue<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Append an operation to the end of its scope's queue.
    pub fn enqueue(&self, operation: PendingOperation) -> Result<()> {
        let scope = ScopeKey::from_storage_key(&operation.scope_key)?;
        let _guard = self.guard();
        let mut ops = self.peek_all(&scope)?;
        ops.push(operation);
        self.store(&scope, &ops)
    }

    /// Every queued operation for a scope, oldest first.
    pub fn peek_all(&self, scope: &ScopeKey) -> Result<Vec<PendingOperation>> {
        let key = scope.pending_key();
        match self.storage.get(&key)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| Error::CorruptEntry {
                key,
                reason: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    /// The oldest queued operation for a scope.
    pub fn front(&self, scope: &ScopeKey) -> Result<Option<PendingOperation>> {
        Ok(self.peek_all(scope)?.into_iter().next())
    }

    /// Number of queued operations for a scope.
    pub fn len(&self, scope: &ScopeKey) -> Result<usize> {
        Ok(self.peek_all(scope)?.len())
    }

    /// Whether a scope has nothing queued.
    pub fn is_empty(&self, scope: &ScopeKey) -> Result<bool> {
        Ok(self.len(scope)? == 0)
    }

    /// Remove the head operation once the server has confirmed it.
    ///
    /// Only the head can be acknowledged; a key that does not match the head
    /// leaves the queue untouched and returns `None`.
    pub fn acknowledge(
        &self,
        scope: &ScopeKey,
        idempotency_key: &str,
    ) -> Result<Option<PendingOperation>> {
        let _guard = self.guard();
        let mut ops = self.peek_all(scope)?;
        match ops.first() {
            Some(head) if head.idempotency_key == idempotency_key => {
                let head = ops.remove(0);
                self.store(scope, &ops)?;
                Ok(Some(head))
            }
            _ => Ok(None),
        }
    }

    /// Clear the whole queue for a scope.
    pub fn drain(&self, scope: &ScopeKey) -> Result<()> {
        let _guard = self.guard();
        self.storage.remove(&scope.pending_key())
    }

    /// Every scope that currently has queued operations.
    pub fn scopes(&self) -> Result<Vec<ScopeKey>> {
        let mut scopes = Vec::new();
        for key in self.storage.keys()? {
            // Foreign keys under the prefix are not ours to replay.
            let Ok(scope) = ScopeKey::from_pending_key(&key) else {
                continue;
            };
            if !self.is_empty(&scope)? {
                scopes.push(scope);
            }
        }
        Ok(scopes)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, scope: &ScopeKey, ops: &[PendingOperation]) -> Result<()> {
        let key = scope.pending_key();
        if ops.is_empty() {
            return self.storage.remove(&key);
        }
        let json = serde_json::to_string(ops).map_err(|e| Error::InvalidPayload(e.to_string()))?;
        self.storage.set(&key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStorage, OpMethod};
    use serde_json::json;

    fn scope() -> ScopeKey {
        ScopeKey::new("payments", "123").unwrap().with_filter("FIRST-TERM")
    }

    fn op(n: u64) -> PendingOperation {
        PendingOperation::new(
            &scope(),
            OpMethod::Create,
            "/api/finance/payments",
            json!({"amountPaid": n}),
            format!("idem-{n}"),
            1000 + n,
        )
    }

    #[test]
    fn empty_queue() {
        let queue = PendingQueue::new(MemoryStorage::new());
        assert!(queue.peek_all(&scope()).unwrap().is_empty());
        assert!(queue.is_empty(&scope()).unwrap());
        assert!(queue.front(&scope()).unwrap().is_none());
    }

    #[test]
    fn enqueue_preserves_order() {
        let queue = PendingQueue::new(MemoryStorage::new());
        for n in 1..=3 {
            queue.enqueue(op(n)).unwrap();
        }

        let keys: Vec<_> = queue
            .peek_all(&scope())
            .unwrap()
            .into_iter()
            .map(|op| op.idempotency_key)
            .collect();
        assert_eq!(keys, vec!["idem-1", "idem-2", "idem-3"]);
    }

    #[test]
    fn peek_is_non_destructive() {
        let queue = PendingQueue::new(MemoryStorage::new());
        queue.enqueue(op(1)).unwrap();
        queue.peek_all(&scope()).unwrap();
        assert_eq!(queue.len(&scope()).unwrap(), 1);
    }

    #[test]
    fn order_survives_restart() {
        let storage = MemoryStorage::new();
        {
            let queue = PendingQueue::new(storage.clone());
            queue.enqueue(op(1)).unwrap();
            queue.enqueue(op(2)).unwrap();
        }

        let reopened = PendingQueue::new(storage);
        let ops = reopened.peek_all(&scope()).unwrap();
        assert_eq!(ops, vec![op(1), op(2)]);
    }

    #[test]
    fn acknowledge_removes_head_only() {
        let queue = PendingQueue::new(MemoryStorage::new());
        for n in 1..=3 {
            queue.enqueue(op(n)).unwrap();
        }

        let removed = queue.acknowledge(&scope(), "idem-1").unwrap();
        assert_eq!(removed, Some(op(1)));
        assert_eq!(queue.peek_all(&scope()).unwrap(), vec![op(2), op(3)]);
    }

    #[test]
    fn acknowledge_ignores_non_head() {
        let queue = PendingQueue::new(MemoryStorage::new());
        queue.enqueue(op(1)).unwrap();
        queue.enqueue(op(2)).unwrap();

        assert_eq!(queue.acknowledge(&scope(), "idem-2").unwrap(), None);
        assert_eq!(queue.len(&scope()).unwrap(), 2);
    }

    #[test]
    fn concurrent_enqueues_are_all_kept() {
        let queue = PendingQueue::new(MemoryStorage::new());
        std::thread::scope(|s| {
            for t in 0..8 {
                let queue = queue.clone();
                s.spawn(move || {
                    for n in 0..50 {
                        queue.enqueue(op(t * 100 + n)).unwrap();
                    }
                });
            }
        });

        let ops = queue.peek_all(&scope()).unwrap();
        assert_eq!(ops.len(), 400);
        let mut keys: Vec<_> = ops.into_iter().map(|op| op.idempotency_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 400);
    }

    #[test]
    fn acknowledge_during_enqueues_loses_nothing() {
        let queue = PendingQueue::new(MemoryStorage::new());
        for n in 0..100 {
            queue.enqueue(op(n)).unwrap();
        }

        std::thread::scope(|s| {
            let producer = queue.clone();
            s.spawn(move || {
                for n in 100..200 {
                    producer.enqueue(op(n)).unwrap();
                }
            });
            for n in 0..100 {
                assert!(queue
                    .acknowledge(&scope(), &format!("idem-{n}"))
                    .unwrap()
                    .is_some());
            }
        });

        let keys: Vec<_> = queue
            .peek_all(&scope())
            .unwrap()
            .into_iter()
            .map(|op| op.idempotency_key)
            .collect();
        let expected: Vec<_> = (100..200).map(|n| format!("idem-{n}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn drain_clears_everything() {
        let queue = PendingQueue::new(MemoryStorage::new());
        queue.enqueue(op(1)).unwrap();
        queue.enqueue(op(2)).unwrap();
        queue.drain(&scope()).unwrap();
        assert!(queue.is_empty(&scope()).unwrap());
    }

    #[test]
    fn scopes_lists_non_empty_queues() {
        let storage = MemoryStorage::new();
        let queue = PendingQueue::new(storage.clone());
        storage.set("students_55", "[]").unwrap();
        queue.enqueue(op(1)).unwrap();

        let other = ScopeKey::new("students", "55").unwrap();
        queue
            .enqueue(PendingOperation::new(
                &other,
                OpMethod::Update,
                "/api/students/9",
                json!({"id": 9}),
                "idem-x",
                1,
            ))
            .unwrap();
        queue.acknowledge(&other, "idem-x").unwrap();

        assert_eq!(queue.scopes().unwrap(), vec![scope()]);
    }

    #[test]
    fn enqueue_fails_cleanly_on_quota() {
        let queue = PendingQueue::new(MemoryStorage::with_quota(64));
        let err = queue.enqueue(op(1)).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(queue.is_empty(&scope()).unwrap());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_partial_drain_keeps_suffix(total in 1u64..20, confirmed in 0u64..20) {
                let confirmed = confirmed.min(total);
                let queue = PendingQueue::new(MemoryStorage::new());
                let ops: Vec<_> = (1..=total).map(op).collect();
                for item in &ops {
                    queue.enqueue(item.clone()).unwrap();
                }

                for item in ops.iter().take(confirmed as usize) {
                    let removed = queue.acknowledge(&scope(), &item.idempotency_key).unwrap();
                    prop_assert_eq!(removed.as_ref(), Some(item));
                }

                let remaining = queue.peek_all(&scope()).unwrap();
                prop_assert_eq!(remaining.as_slice(), &ops[confirmed as usize..]);
            }
        }
    }
}
