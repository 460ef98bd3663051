//! Sync coordinator.
//!
//! Owns the cache and the pending queue, drives the per-scope
//! [`SyncState`] machine, and decides for every read and write whether the
//! network, the cache or the queue answers it.
//!
//! Reads go to the network and fall back to the cache. Writes go to the
//! network while the monitor reports online and fall back to the queue.
//! Queued writes are replayed per scope in FIFO order, one request in flight
//! at a time, whenever the monitor reports a reconnect. An online write to a
//! scope with queued writes replays them first and queues behind them if the
//! replay stops.
//!
//! Two locks per scope: an async flush lock held for a whole replay or online
//! write, and a short synchronous lock around every cache and queue update so
//! that read-modify-write cycles on storage never interleave.
//!
//! The coordinator is a cheap handle: clones share the same state. The
//! reconnect listener is registered once, at construction, and is torn down
//! by [`SyncCoordinator::shutdown`] or when the last handle is dropped.

use crate::error::{Result, SyncError, SyncWarning};
use crate::reachability::{ReachabilityMonitor, Transition};
use crate::remote::RemoteClient;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use skul_sync_engine::{
    apply_confirmed, merge_pending, record_id, CacheStore, Error as EngineError, KeyValueStorage,
    OpMethod, PendingOperation, PendingQueue, ResponseBody, ScopeKey, SyncState, SyncTrigger,
    Timestamp,
};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Default bound on every network call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const EVENT_CAPACITY: usize = 64;

/// A cached resource: where it is stored and where it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub key: ScopeKey,
    pub path: String,
}

impl ResourceScope {
    pub fn new(key: ScopeKey, path: impl Into<String>) -> Self {
        Self {
            key,
            path: path.into(),
        }
    }
}

/// A write to send, or to queue when it cannot be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub method: OpMethod,
    pub path: String,
    pub payload: Value,
}

impl WriteRequest {
    /// A `POST` of a new record.
    pub fn create(path: impl Into<String>, payload: Value) -> Self {
        Self {
            method: OpMethod::Create,
            path: path.into(),
            payload,
        }
    }

    /// A `PUT` of an existing record.
    pub fn update(path: impl Into<String>, payload: Value) -> Self {
        Self {
            method: OpMethod::Update,
            path: path.into(),
            payload,
        }
    }
}

/// How current the records of a [`LoadOutcome`] are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Freshness {
    /// Straight from the server.
    Fresh,
    /// From the cache, last confirmed at `saved_at`.
    StaleCache {
        #[serde(rename = "savedAt")]
        saved_at: Timestamp,
    },
    /// Neither the server nor the cache had anything.
    NoCache,
}

/// Records to render for a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Confirmed records followed by pending overlays
    pub records: Vec<Value>,
    pub freshness: Freshness,
    pub warnings: Vec<SyncWarning>,
}

impl LoadOutcome {
    /// Whether the UI should flag the data as possibly out of date.
    pub fn is_stale(&self) -> bool {
        !matches!(self.freshness, Freshness::Fresh)
    }
}

/// Result of [`SyncCoordinator::write`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The server accepted the write.
    Confirmed {
        operation: PendingOperation,
        records: Vec<Value>,
        warnings: Vec<SyncWarning>,
    },
    /// The write is queued and will be replayed on reconnect.
    Queued {
        operation: PendingOperation,
        records: Vec<Value>,
    },
}

impl WriteOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued { .. })
    }

    pub fn operation(&self) -> &PendingOperation {
        match self {
            WriteOutcome::Confirmed { operation, .. } | WriteOutcome::Queued { operation, .. } => {
                operation
            }
        }
    }

    /// The scope's records after the write, pending overlays included.
    pub fn records(&self) -> &[Value] {
        match self {
            WriteOutcome::Confirmed { records, .. } | WriteOutcome::Queued { records, .. } => {
                records
            }
        }
    }
}

/// Result of a completed flush.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub scope_key: ScopeKey,
    /// Operations confirmed and removed from the queue
    pub confirmed: usize,
    pub warnings: Vec<SyncWarning>,
}

/// Snapshot of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeStatus {
    pub state: SyncState,
    /// The UI should flag this scope as possibly out of date.
    pub stale: bool,
    pub pending: usize,
    pub cached_at: Option<Timestamp>,
}

/// Published on every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub scope_key: ScopeKey,
    pub state: SyncState,
}

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub request_timeout: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

struct Shared<R, S> {
    remote: R,
    cache: CacheStore<S>,
    queue: PendingQueue<S>,
    monitor: ReachabilityMonitor,
    options: CoordinatorOptions,
    states: DashMap<ScopeKey, SyncState>,
    /// Latest load per scope; older loads are discarded on completion.
    generations: DashMap<ScopeKey, u64>,
    /// Confirmed writes per scope; a load that overlaps one is discarded.
    confirmations: DashMap<ScopeKey, u64>,
    flush_locks: DashMap<ScopeKey, Arc<tokio::sync::Mutex<()>>>,
    scope_locks: DashMap<ScopeKey, Arc<Mutex<()>>>,
    events: broadcast::Sender<StateChange>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<R, S> Drop for Shared<R, S> {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            handle.abort();
        }
    }
}

/// Offline-resilient read/write front for a set of resource scopes.
pub struct SyncCoordinator<R, S> {
    shared: Arc<Shared<R, S>>,
}

impl<R, S> Clone for SyncCoordinator<R, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R, S> SyncCoordinator<R, S>
where
    R: RemoteClient + 'static,
    S: KeyValueStorage + Clone + 'static,
{
    /// Create a coordinator and register its reconnect listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(remote: R, storage: S, monitor: ReachabilityMonitor) -> Self {
        Self::with_options(remote, storage, monitor, CoordinatorOptions::default())
    }

    /// Create a coordinator with explicit options.
    pub fn with_options(
        remote: R,
        storage: S,
        monitor: ReachabilityMonitor,
        options: CoordinatorOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            remote,
            cache: CacheStore::new(storage.clone()),
            queue: PendingQueue::new(storage),
            monitor,
            options,
            states: DashMap::new(),
            generations: DashMap::new(),
            confirmations: DashMap::new(),
            flush_locks: DashMap::new(),
            scope_locks: DashMap::new(),
            events,
            listener: Mutex::new(None),
        });

        let handle = spawn_listener(&shared);
        *shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Self { shared }
    }

    /// The reachability monitor this coordinator listens to.
    pub fn monitor(&self) -> &ReachabilityMonitor {
        &self.shared.monitor
    }

    /// Listen for state changes of every scope.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.shared.events.subscribe()
    }

    /// Current state of a scope.
    pub fn state(&self, key: &ScopeKey) -> SyncState {
        self.shared
            .states
            .get(key)
            .map(|state| *state)
            .unwrap_or_default()
    }

    /// State, queue depth and cache age of a scope.
    pub fn status(&self, key: &ScopeKey) -> Result<ScopeStatus> {
        let state = self.state(key);
        Ok(ScopeStatus {
            state,
            stale: state.is_stale(),
            pending: self.shared.queue.len(key)?,
            cached_at: self.shared.cache.read(key).ok().flatten().map(|c| c.saved_at),
        })
    }

    /// Queued operations of a scope, oldest first.
    pub fn pending(&self, key: &ScopeKey) -> Result<Vec<PendingOperation>> {
        Ok(self.shared.queue.peek_all(key)?)
    }

    /// Drop the cached records of a scope so the next load starts clean.
    ///
    /// Queued operations are kept.
    pub fn clear_cache(&self, key: &ScopeKey) -> Result<()> {
        self.with_scope_lock(key, || self.shared.cache.clear(key))?;
        tracing::info!(scope = %key, "Cache cleared");
        Ok(())
    }

    /// Cached records with pending overlays, without touching the network.
    pub fn peek(&self, scope: &ResourceScope) -> LoadOutcome {
        let mut warnings = Vec::new();
        let (records, saved_at) = self.cached_records(&scope.key, &mut warnings);
        let records = self.with_overlays(&scope.key, records, &mut warnings);

        LoadOutcome {
            records,
            freshness: saved_at
                .map(|saved_at| Freshness::StaleCache { saved_at })
                .unwrap_or(Freshness::NoCache),
            warnings,
        }
    }

    /// Fetch a scope from the server, falling back to the cache.
    ///
    /// Transient failures are not errors: the cached records come back with
    /// a stale [`Freshness`]. Expired credentials are an error. A load that
    /// is overtaken by a newer load of the same scope returns
    /// [`SyncError::Superseded`] and changes nothing. A load that overlaps a
    /// confirmed write to the same scope also returns
    /// [`SyncError::Superseded`] and leaves the cache as the write left it.
    pub async fn load(&self, scope: &ResourceScope) -> Result<LoadOutcome> {
        let key = &scope.key;
        let generation = self.begin_load(key);
        let confirmations = self.confirmations(key);
        self.transition(key, SyncTrigger::LoadStarted);
        tracing::debug!(scope = %key, generation, "Load started");

        let result = self
            .call(self.shared.remote.fetch(&scope.path))
            .await
            .and_then(|body| Ok(ResponseBody::from_json(body)?));

        if !self.is_latest_load(key, generation) {
            tracing::debug!(scope = %key, generation, "Load superseded, result discarded");
            return Err(SyncError::Superseded);
        }

        match result {
            Ok(body) => {
                let mut warnings = Vec::new();
                let records = body.into_records();
                let persisted = self.with_scope_lock(key, || {
                    if !self.is_latest_load(key, generation) {
                        return Err(SyncError::Superseded);
                    }
                    if self.confirmations(key) != confirmations {
                        // No newer load exists to settle the state.
                        self.transition(key, SyncTrigger::LoadSucceeded);
                        return Err(SyncError::Superseded);
                    }
                    self.persist(key, records.clone(), &mut warnings);
                    Ok(())
                });
                if let Err(err) = persisted {
                    tracing::debug!(scope = %key, generation, "Load overtaken, result discarded");
                    return Err(err);
                }
                self.transition(key, SyncTrigger::LoadSucceeded);
                tracing::info!(scope = %key, count = records.len(), "Load succeeded");

                Ok(LoadOutcome {
                    records: self.with_overlays(key, records, &mut warnings),
                    freshness: Freshness::Fresh,
                    warnings,
                })
            }
            Err(SyncError::AuthExpired) => {
                self.shared.remote.clear_credentials();
                self.transition(key, SyncTrigger::LoadFailed);
                tracing::warn!(scope = %key, "Load rejected, credentials expired");
                Err(SyncError::AuthExpired)
            }
            Err(err) => {
                tracing::warn!(scope = %key, error = %err, "Load failed, serving cache");
                self.transition(key, SyncTrigger::LoadFailed);
                Ok(self.peek(scope))
            }
        }
    }

    /// Send a write, or queue it when it cannot be sent.
    ///
    /// Queuing is not an error. Validation failures and expired credentials
    /// are returned as errors and nothing is queued. Writes already queued
    /// for the scope are replayed before this one is sent; if that replay
    /// stops, this write is queued behind them.
    pub async fn write(&self, scope: &ResourceScope, request: WriteRequest) -> Result<WriteOutcome> {
        let key = &scope.key;
        let mut operation = PendingOperation::new(
            key,
            request.method,
            request.path,
            request.payload,
            Uuid::new_v4().to_string(),
            now(),
        );

        if self.shared.monitor.is_online() {
            let lock = self.flush_lock(key);
            let _flushing = lock.lock().await;

            if !self.shared.queue.is_empty(key)? {
                match self.replay(key).await {
                    Ok(_) => {}
                    Err(SyncError::ReplayHalted { source, .. })
                        if matches!(*source, SyncError::AuthExpired) =>
                    {
                        tracing::warn!(scope = %key, "Write rejected, credentials expired");
                        return Err(SyncError::AuthExpired);
                    }
                    Err(err) => {
                        tracing::warn!(
                            scope = %key,
                            error = %err,
                            "Earlier writes still queued, queuing behind them"
                        );
                        return self.enqueue(key, operation);
                    }
                }
            }

            match self.submit(&operation).await {
                Ok(body) => {
                    let mut warnings = Vec::new();
                    let records = self.with_scope_lock(key, || {
                        self.fold_confirmed(key, &mut operation, body, &mut warnings)
                    });
                    tracing::info!(
                        scope = %key,
                        key = %operation.idempotency_key,
                        "Write confirmed"
                    );
                    return Ok(WriteOutcome::Confirmed {
                        operation,
                        records: self.with_overlays(key, records, &mut warnings),
                        warnings,
                    });
                }
                Err(SyncError::AuthExpired) => {
                    self.shared.remote.clear_credentials();
                    tracing::warn!(scope = %key, "Write rejected, credentials expired");
                    return Err(SyncError::AuthExpired);
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!(scope = %key, error = %err, "Write failed, queuing");
                }
                Err(err) => return Err(err),
            }
        }

        self.enqueue(key, operation)
    }

    /// Replay a scope's queue in order.
    ///
    /// Each confirmed operation leaves the queue on its own. The first
    /// failure stops the replay; it and everything behind it stay queued.
    pub async fn flush_queue(&self, key: &ScopeKey) -> Result<FlushReport> {
        let lock = self.flush_lock(key);
        let _flushing = lock.lock().await;
        self.replay(key).await
    }

    /// Flush every scope with queued operations, scopes concurrently.
    pub async fn flush_all(&self) -> Result<Vec<(ScopeKey, Result<FlushReport>)>> {
        let scopes = self.shared.queue.scopes()?;
        let mut flushes = Vec::with_capacity(scopes.len());
        for key in &scopes {
            flushes.push(self.flush_queue(key));
        }
        let results = join_all(flushes).await;
        Ok(scopes.into_iter().zip(results).collect())
    }

    /// Stop listening for reconnects. Safe to call more than once.
    pub fn shutdown(&self) {
        let listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            handle.abort();
            tracing::info!("Sync coordinator shut down");
        }
    }

    /// Replay loop. Caller holds the scope's flush lock.
    async fn replay(&self, key: &ScopeKey) -> Result<FlushReport> {
        self.transition(key, SyncTrigger::FlushStarted);
        let mut confirmed = 0;
        let mut warnings = Vec::new();

        loop {
            let mut head = match self.shared.queue.front(key) {
                Ok(Some(head)) => head,
                Ok(None) => break,
                Err(err) => return Err(self.halt(key, confirmed, err.into())),
            };

            let body = match self.submit(&head).await {
                Ok(body) => body,
                Err(err) => {
                    if matches!(err, SyncError::AuthExpired) {
                        self.shared.remote.clear_credentials();
                    }
                    return Err(self.halt(key, confirmed, err));
                }
            };

            let acknowledged = self.with_scope_lock(key, || -> Result<()> {
                match self.shared.queue.acknowledge(key, &head.idempotency_key)? {
                    Some(_) => {
                        self.fold_confirmed(key, &mut head, body, &mut warnings);
                        Ok(())
                    }
                    None => Err(SyncError::Engine(EngineError::Storage(format!(
                        "operation {} left the head of the queue while in flight",
                        head.idempotency_key
                    )))),
                }
            });
            if let Err(err) = acknowledged {
                return Err(self.halt(key, confirmed, err));
            }

            confirmed += 1;
            tracing::debug!(scope = %key, key = %head.idempotency_key, "Replayed operation confirmed");
        }

        self.transition(key, SyncTrigger::FlushCompleted);
        tracing::info!(scope = %key, confirmed, "Queue flushed");

        Ok(FlushReport {
            scope_key: key.clone(),
            confirmed,
            warnings,
        })
    }

    async fn call<F>(&self, request: F) -> Result<Value>
    where
        F: Future<Output = Result<Value>>,
    {
        let timeout = self.shared.options.request_timeout;
        let result = match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(timeout)),
        };

        if let Err(err) = &result {
            if err.is_unreachable() {
                self.shared.monitor.set_online(false);
            }
        }
        result
    }

    async fn submit(&self, operation: &PendingOperation) -> Result<Value> {
        self.call(self.shared.remote.submit(
            operation.method,
            &operation.path,
            &operation.payload,
            &operation.idempotency_key,
        ))
        .await
    }

    fn enqueue(&self, key: &ScopeKey, operation: PendingOperation) -> Result<WriteOutcome> {
        self.with_scope_lock(key, || self.shared.queue.enqueue(operation.clone()))?;
        tracing::info!(
            scope = %key,
            key = %operation.idempotency_key,
            method = %operation.method,
            "Write queued"
        );

        let mut warnings = Vec::new();
        let (records, _) = self.cached_records(key, &mut warnings);
        Ok(WriteOutcome::Queued {
            operation,
            records: self.with_overlays(key, records, &mut warnings),
        })
    }

    /// Merge a server-confirmed operation into the cache and return the new
    /// confirmed records. Caller holds the scope lock.
    fn fold_confirmed(
        &self,
        key: &ScopeKey,
        operation: &mut PendingOperation,
        body: Value,
        warnings: &mut Vec<SyncWarning>,
    ) -> Vec<Value> {
        let response = ResponseBody::from_json(body).unwrap_or_else(|err| {
            tracing::debug!(scope = %key, error = %err, "Unstructured acknowledgement");
            ResponseBody::Empty
        });
        let server_id = match &response {
            ResponseBody::Single(record) => record_id(record),
            _ => None,
        };

        let (cached, _) = self.cached_records(key, warnings);
        let records = apply_confirmed(cached, operation, response);
        operation.confirm(server_id);
        *self.shared.confirmations.entry(key.clone()).or_insert(0) += 1;
        self.persist(key, records.clone(), warnings);
        records
    }

    /// Run a storage update with the scope's storage lock held.
    ///
    /// `f` must not block on anything but storage.
    fn with_scope_lock<T>(&self, key: &ScopeKey, f: impl FnOnce() -> T) -> T {
        let lock = self.shared.scope_locks.entry(key.clone()).or_default().clone();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn flush_lock(&self, key: &ScopeKey) -> Arc<tokio::sync::Mutex<()>> {
        self.shared.flush_locks.entry(key.clone()).or_default().clone()
    }

    fn cached_records(
        &self,
        key: &ScopeKey,
        warnings: &mut Vec<SyncWarning>,
    ) -> (Vec<Value>, Option<Timestamp>) {
        match self.shared.cache.read(key) {
            Ok(Some(cached)) => (cached.payload, Some(cached.saved_at)),
            Ok(None) => (Vec::new(), None),
            Err(err) => {
                tracing::warn!(scope = %key, error = %err, "Ignoring unreadable cache entry");
                warnings.push(SyncWarning::CacheUnreadable {
                    key: key.storage_key(),
                    reason: err.to_string(),
                });
                (Vec::new(), None)
            }
        }
    }

    fn with_overlays(
        &self,
        key: &ScopeKey,
        records: Vec<Value>,
        warnings: &mut Vec<SyncWarning>,
    ) -> Vec<Value> {
        match self.shared.queue.peek_all(key) {
            Ok(pending) if pending.is_empty() => records,
            Ok(pending) => merge_pending(&records, &pending),
            Err(err) => {
                tracing::warn!(scope = %key, error = %err, "Ignoring unreadable queue");
                warnings.push(SyncWarning::CacheUnreadable {
                    key: key.pending_key(),
                    reason: err.to_string(),
                });
                records
            }
        }
    }

    fn persist(&self, key: &ScopeKey, records: Vec<Value>, warnings: &mut Vec<SyncWarning>) {
        match self.shared.cache.write(key, records, now()) {
            Ok(_) => {}
            Err(err) if err.is_quota_exceeded() => {
                tracing::warn!(scope = %key, "Storage quota exceeded, cache not updated");
                warnings.push(SyncWarning::StorageQuotaExceeded {
                    key: key.storage_key(),
                });
            }
            Err(err) => {
                tracing::warn!(scope = %key, error = %err, "Cache write failed");
                warnings.push(SyncWarning::CacheWriteFailed {
                    key: key.storage_key(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn halt(&self, key: &ScopeKey, confirmed: usize, source: SyncError) -> SyncError {
        self.transition(key, SyncTrigger::FlushFailed);
        let remaining = self.shared.queue.len(key).unwrap_or_default();
        tracing::warn!(scope = %key, confirmed, remaining, error = %source, "Replay halted");

        SyncError::ReplayHalted {
            confirmed,
            remaining,
            source: Box::new(source),
        }
    }

    fn begin_load(&self, key: &ScopeKey) -> u64 {
        let mut generation = self.shared.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn confirmations(&self, key: &ScopeKey) -> u64 {
        self.shared
            .confirmations
            .get(key)
            .map(|count| *count)
            .unwrap_or_default()
    }

    fn is_latest_load(&self, key: &ScopeKey, generation: u64) -> bool {
        self.shared
            .generations
            .get(key)
            .is_some_and(|latest| *latest == generation)
    }

    fn transition(&self, key: &ScopeKey, trigger: SyncTrigger) {
        let (previous, next) = {
            let mut state = self.shared.states.entry(key.clone()).or_default();
            let previous = *state;
            *state = previous.on(trigger);
            (previous, *state)
        };

        if previous != next {
            tracing::debug!(scope = %key, from = %previous, to = %next, "State changed");
            let _ = self.shared.events.send(StateChange {
                scope_key: key.clone(),
                state: next,
            });
        }
    }
}

fn spawn_listener<R, S>(shared: &Arc<Shared<R, S>>) -> JoinHandle<()>
where
    R: RemoteClient + 'static,
    S: KeyValueStorage + Clone + 'static,
{
    let weak: Weak<Shared<R, S>> = Arc::downgrade(shared);
    let mut subscription = shared.monitor.subscribe();

    tokio::spawn(async move {
        while let Some(transition) = subscription.next_transition().await {
            if transition != Transition::BecameOnline {
                continue;
            }
            let Some(shared) = weak.upgrade() else {
                break;
            };

            tracing::info!("Back online, replaying queued writes");
            let coordinator = SyncCoordinator { shared };
            match coordinator.flush_all().await {
                Ok(results) => {
                    for (key, result) in results {
                        if let Err(err) = result {
                            tracing::warn!(scope = %key, error = %err, "Reconnect flush incomplete");
                        }
                    }
                }
                Err(err) => tracing::error!(error = %err, "Failed to list queued scopes"),
            }
        }
    })
}

fn now() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ui_payloads_serialize_in_camel_case() {
        let change = StateChange {
            scope_key: ScopeKey::new("students", "55").unwrap(),
            state: SyncState::LoadFailedShowingCache,
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({
                "scopeKey": {"resource": "students", "scopeId": "55"},
                "state": "loadFailedShowingCache"
            })
        );

        assert_eq!(
            serde_json::to_value(Freshness::StaleCache { saved_at: 1000 }).unwrap(),
            json!({"kind": "staleCache", "savedAt": 1000})
        );
    }

    #[test]
    fn write_outcome_accessors() {
        let scope = ScopeKey::new("students", "55").unwrap();
        let operation =
            PendingOperation::new(&scope, OpMethod::Create, "/api/students", json!({}), "k", 1);
        let outcome = WriteOutcome::Queued {
            operation: operation.clone(),
            records: vec![json!({"pending": true})],
        };

        assert!(outcome.is_queued());
        assert_eq!(outcome.operation(), &operation);
        assert_eq!(outcome.records().len(), 1);
    }
}
