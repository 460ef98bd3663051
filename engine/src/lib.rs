//! # Skul Sync Engine
//!
//! The deterministic core of an offline-resilient record synchronizer.
//!
//! This crate holds the pieces of offline-first behaviour that need no
//! network: where things are cached, how unconfirmed writes are queued, how
//! pending writes are laid over cached data, and what state each scope is in.
//! The async IO layer (HTTP, reachability, the coordinator) lives in
//! `skul-sync-client`.
//!
//! ## Design Principles
//!
//! - **No IO**: storage is a trait; the engine never touches files or sockets
//! - **Deterministic**: time is passed in, never read from the system clock
//! - **Testable**: an in-memory storage backend ships with the crate
//!
//! ## Core Concepts
//!
//! ### Scopes
//!
//! A [`ScopeKey`] names a resource plus its query filters (for example the
//! payments of student `123` in `FIRST_TERM`). It renders to a flat,
//! collision-free storage key.
//!
//! ### Cache
//!
//! The [`CacheStore`] keeps the last-known-good server payload per scope as a
//! [`CachedRecord`].
//!
//! ### Pending Queue
//!
//! The [`PendingQueue`] keeps writes the server has not confirmed yet as
//! [`PendingOperation`]s, in strict insertion order per scope. Confirmed
//! operations are acknowledged one at a time from the front.
//!
//! ### Merging
//!
//! [`merge_pending`] lays queued writes over cached data (marked
//! `pending: true`) and [`apply_confirmed`] folds a confirmed write into the
//! cache.
//!
//! ## Quick Start
//!
//! ```rust
//! use skul_sync_engine::{
//!     merge_pending, CacheStore, MemoryStorage, OpMethod, PendingOperation, PendingQueue,
//!     ScopeKey,
//! };
//! use serde_json::json;
//!
//! // 1. One storage medium shared by cache and queue
//! let storage = MemoryStorage::new();
//! let cache = CacheStore::new(storage.clone());
//! let queue = PendingQueue::new(storage);
//!
//! // 2. A scope: payments of student 123 for the first term
//! let scope = ScopeKey::new("payments", "123").unwrap().with_filter("FIRST_TERM");
//!
//! // 3. Cache what the server returned
//! cache
//!     .write(&scope, vec![json!({"id": 1, "amountPaid": 5000})], 1706745600000)
//!     .unwrap();
//!
//! // 4. Queue a write made while offline
//! queue
//!     .enqueue(PendingOperation::new(
//!         &scope,
//!         OpMethod::Create,
//!         "/api/finance/payments",
//!         json!({"amountPaid": 2000, "term": "FIRST_TERM"}),
//!         "idem-1",
//!         1706745601000,
//!     ))
//!     .unwrap();
//!
//! // 5. What the UI shows
//! let cached = cache.read(&scope).unwrap().unwrap();
//! let view = merge_pending(&cached.payload, &queue.peek_all(&scope).unwrap());
//! assert_eq!(view.len(), 2);
//! assert_eq!(view[1]["pending"], json!(true));
//! ```

pub mod cache;
pub mod error;
pub mod merge;
pub mod operation;
pub mod payload;
pub mod queue;
pub mod record;
pub mod scope;
pub mod state;
pub mod storage;

// Re-export main types at crate root
pub use cache::{CacheStore, CachedList};
pub use error::Error;
pub use merge::{apply_confirmed, merge_pending, record_id};
pub use operation::{OpMethod, PendingOperation};
pub use payload::{error_message, ResponseBody};
pub use queue::PendingQueue;
pub use record::{CachedRecord, RECORD_FORMAT_VERSION};
pub use scope::ScopeKey;
pub use state::{SyncState, SyncTrigger};
pub use storage::{KeyValueStorage, MemoryStorage};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Client-generated token used by the server to deduplicate replays.
pub type IdempotencyKey = String;
