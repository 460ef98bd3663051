//! Error taxonomy for the sync client.
//!
//! Transient failures (`NetworkUnreachable`, `ServerRejected`, `Timeout`)
//! are recovered locally by queuing writes or serving cache. Validation and
//! authentication failures are surfaced to the caller as-is.

use skul_sync_engine::error_message;
use std::time::Duration;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("server rejected request with status {status}: {body}")]
    ServerRejected { status: u16, body: String },

    #[error("request rejected as invalid ({status}): {message}")]
    Validation { status: u16, message: String },

    #[error("authentication expired, re-login required")]
    AuthExpired,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("load superseded by a newer request for the same scope")]
    Superseded,

    #[error("replay halted after {confirmed} confirmed, {remaining} still queued: {source}")]
    ReplayHalted {
        confirmed: usize,
        remaining: usize,
        #[source]
        source: Box<SyncError>,
    },

    #[error("local storage quota exceeded for '{0}'")]
    StorageQuotaExceeded(String),

    #[error("Engine error: {0}")]
    Engine(skul_sync_engine::Error),
}

impl SyncError {
    /// Classify a non-2xx response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => SyncError::AuthExpired,
            408 | 429 | 500..=599 => SyncError::ServerRejected { status, body },
            400..=499 => SyncError::Validation {
                status,
                message: error_message(&body),
            },
            _ => SyncError::ServerRejected { status, body },
        }
    }

    /// Whether the failure is worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::NetworkUnreachable(_)
                | SyncError::ServerRejected { .. }
                | SyncError::Timeout(_)
        )
    }

    /// Whether the failure means the transport itself is down.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SyncError::NetworkUnreachable(_))
    }
}

impl From<skul_sync_engine::Error> for SyncError {
    fn from(err: skul_sync_engine::Error) -> Self {
        match err {
            skul_sync_engine::Error::StorageQuotaExceeded { key } => {
                SyncError::StorageQuotaExceeded(key)
            }
            other => SyncError::Engine(other),
        }
    }
}

/// Non-fatal conditions attached to an otherwise successful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// Fresh data could not be persisted; it is still returned.
    StorageQuotaExceeded { key: String },
    /// Fresh data could not be persisted for another reason.
    CacheWriteFailed { key: String, reason: String },
    /// The cached entry could not be read and was ignored.
    CacheUnreadable { key: String, reason: String },
}

/// Result type alias for the client.
pub type Result<T> = std::result::Result<T, SyncError>;
