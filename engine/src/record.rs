//! Cached snapshots of server resources.

use crate::{error::Result, Error, Timestamp};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Version of the persisted cache envelope.
pub const RECORD_FORMAT_VERSION: u32 = 1;

/// The last-known-good server value for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord<T> {
    /// Envelope format version
    pub format_version: u32,
    /// Rendered storage key of the scope
    pub scope_key: String,
    /// The server-returned value
    pub payload: T,
    /// When the payload was saved (milliseconds since epoch). Informational only.
    pub saved_at: Timestamp,
}

impl<T> CachedRecord<T> {
    /// Wrap a payload for storage.
    pub fn new(scope_key: impl Into<String>, payload: T, saved_at: Timestamp) -> Self {
        Self {
            format_version: RECORD_FORMAT_VERSION,
            scope_key: scope_key.into(),
            payload,
            saved_at,
        }
    }
}

impl<T: Serialize> CachedRecord<T> {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidPayload(e.to_string()))
    }
}

impl<T: DeserializeOwned> CachedRecord<T> {
    /// Deserialize from JSON, rejecting envelopes written by a newer format.
    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json).map_err(|e| Error::CorruptEntry {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        if record.format_version > RECORD_FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                found: record.format_version,
                supported: RECORD_FORMAT_VERSION,
            });
        }

        Ok(record)
    }
}
