//! # Skul Sync Client
//!
//! Offline-resilient access to the Skul Africa REST API.
//!
//! A [`SyncCoordinator`] sits between the application and a
//! [`RemoteClient`]. Reads are served from the network and fall back to a
//! durable cache; writes that cannot reach the server are queued durably
//! and replayed in order once the [`ReachabilityMonitor`] reports a
//! reconnect. The application only ever sees three outcomes: confirmed,
//! queued, or stale cache. Validation failures and expired credentials are
//! surfaced as errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use skul_sync_client::{
//!     Credentials, FileStorage, HttpRemoteClient, ReachabilityMonitor, ResourceScope,
//!     SyncCoordinator, WriteRequest,
//! };
//! use skul_sync_engine::ScopeKey;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = HttpRemoteClient::new(
//!     "https://api.skul.africa",
//!     Credentials::new(Some("token".into())),
//!     Duration::from_secs(10),
//! )?;
//! let storage = FileStorage::open(".skul-cache", None)?;
//! let coordinator = SyncCoordinator::new(remote, storage, ReachabilityMonitor::new(true));
//!
//! let payments = ResourceScope::new(
//!     ScopeKey::new("payments", "123")?.with_filter("FIRST_TERM"),
//!     "/api/students/123/payments?term=FIRST_TERM",
//! );
//!
//! let outcome = coordinator
//!     .write(
//!         &payments,
//!         WriteRequest::create(
//!             "/api/students/123/payments",
//!             json!({"amountPaid": 2000, "term": "FIRST_TERM"}),
//!         ),
//!     )
//!     .await?;
//! if outcome.is_queued() {
//!     println!("saved offline, will sync later");
//! }
//!
//! let view = coordinator.load(&payments).await?;
//! println!("{} records, stale: {}", view.records.len(), view.is_stale());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod reachability;
pub mod remote;
pub mod storage;

pub use auth::Credentials;
pub use config::{Config, ConfigError};
pub use coordinator::{
    CoordinatorOptions, FlushReport, Freshness, LoadOutcome, ResourceScope, ScopeStatus,
    StateChange, SyncCoordinator, WriteOutcome, WriteRequest,
};
pub use error::{Result, SyncError, SyncWarning};
pub use reachability::{spawn_probe, ReachabilityMonitor, ReachabilitySubscription, Transition};
pub use remote::{HttpRemoteClient, RemoteClient};
pub use storage::FileStorage;
