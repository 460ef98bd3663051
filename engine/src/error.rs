//! Error types for the sync engine.

use thiserror::Error;

/// All possible errors from the sync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Key errors
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    // Payload errors
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Storage errors
    #[error("storage quota exceeded while writing '{key}'")]
    StorageQuotaExceeded { key: String },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("corrupt entry '{key}': {reason}")]
    CorruptEntry { key: String, reason: String },

    #[error("unsupported entry format version {found} (max supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },
}

impl Error {
    /// Whether the underlying storage medium ran out of room.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::StorageQuotaExceeded { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidScope("resource must not be empty".into());
        assert_eq!(err.to_string(), "invalid scope: resource must not be empty");

        let err = Error::StorageQuotaExceeded {
            key: "students_55".into(),
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded while writing 'students_55'"
        );

        let err = Error::UnsupportedFormat {
            found: 9,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported entry format version 9 (max supported: 1)"
        );
    }

    #[test]
    fn quota_detection() {
        assert!(Error::StorageQuotaExceeded { key: "k".into() }.is_quota_exceeded());
        assert!(!Error::Storage("disk on fire".into()).is_quota_exceeded());
    }
}
