//! Per-scope synchronisation state machine.
//!
//! ```text
//! Idle / any     --load-->   Loading
//! Loading        --ok-->     Loaded
//! Loading        --fail-->   LoadFailedShowingCache
//! any            --flush-->  Syncing
//! Syncing        --ok-->     Loaded
//! Syncing        --fail-->   SyncFailed
//! ```
//!
//! Transitions are total: a trigger that makes no sense in the current state
//! (for example the completion of a load that was overtaken by a flush)
//! leaves the state unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a scope is in its load/sync lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    #[default]
    Idle,
    Loading,
    Loaded,
    LoadFailedShowingCache,
    Syncing,
    SyncFailed,
}

/// Events that drive [`SyncState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    LoadStarted,
    LoadSucceeded,
    LoadFailed,
    FlushStarted,
    FlushCompleted,
    FlushFailed,
}

impl SyncState {
    /// State after `trigger`.
    pub fn on(self, trigger: SyncTrigger) -> SyncState {
        use SyncState::*;
        use SyncTrigger::*;

        match (self, trigger) {
            (_, LoadStarted) => Loading,
            (Loading, LoadSucceeded) => Loaded,
            (Loading, LoadFailed) => LoadFailedShowingCache,
            (_, FlushStarted) => Syncing,
            (Syncing, FlushCompleted) => Loaded,
            (Syncing, FlushFailed) => SyncFailed,
            (state, _) => state,
        }
    }

    /// Whether what the UI shows for this scope may be out of date.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            SyncState::LoadFailedShowingCache | SyncState::SyncFailed
        )
    }

    /// Whether a network exchange is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, SyncState::Loading | SyncState::Syncing)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncState::Idle => "idle",
            SyncState::Loading => "loading",
            SyncState::Loaded => "loaded",
            SyncState::LoadFailedShowingCache => "load-failed-showing-cache",
            SyncState::Syncing => "syncing",
            SyncState::SyncFailed => "sync-failed",
        };
        f.write_str(label)
    }
}
