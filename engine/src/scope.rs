//! Scope keys identify a cached resource together with its query filters.
//!
//! A scope is rendered into a flat storage key of the form
//! `<resource>_<scopeId>` or `<resource>_<scopeId>_<filter>`, and its queue
//! lives under `pending_<storage key>`. Every component is percent-encoded
//! before joining, so `_` only ever appears as a separator and two different
//! scopes can never render to the same key.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the components of a rendered key.
const SEPARATOR: char = '_';

/// Prefix under which pending queues are stored.
pub const PENDING_PREFIX: &str = "pending_";

/// Resource name that would alias queue keys.
const RESERVED_RESOURCE: &str = "pending";

/// Structured composite key: resource type, owning id, optional filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeKey {
    resource: String,
    scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

impl ScopeKey {
    /// Create a key for a resource owned by `scope_id`.
    pub fn new(resource: impl Into<String>, scope_id: impl Into<String>) -> Result<Self> {
        let resource = resource.into();
        let scope_id = scope_id.into();

        if resource.is_empty() {
            return Err(Error::InvalidScope("resource must not be empty".into()));
        }
        if resource == RESERVED_RESOURCE {
            return Err(Error::InvalidScope(format!(
                "resource name '{RESERVED_RESOURCE}' is reserved for queues"
            )));
        }
        if scope_id.is_empty() {
            return Err(Error::InvalidScope("scope id must not be empty".into()));
        }

        Ok(Self {
            resource,
            scope_id,
            filter: None,
        })
    }

    /// Narrow the key with a query filter (e.g. a term).
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Key under which the cached payload is stored.
    pub fn storage_key(&self) -> String {
        let mut key = encode_component(&self.resource);
        key.push(SEPARATOR);
        key.push_str(&encode_component(&self.scope_id));
        if let Some(filter) = &self.filter {
            key.push(SEPARATOR);
            key.push_str(&encode_component(filter));
        }
        key
    }

    /// Key under which the pending operation queue is stored.
    pub fn pending_key(&self) -> String {
        format!("{PENDING_PREFIX}{}", self.storage_key())
    }

    /// Parse a key previously produced by [`ScopeKey::storage_key`].
    pub fn from_storage_key(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.split(SEPARATOR).collect();
        let (resource, scope_id, filter) = match parts.as_slice() {
            [resource, scope_id] => (*resource, *scope_id, None),
            [resource, scope_id, filter] => (*resource, *scope_id, Some(*filter)),
            _ => {
                return Err(Error::InvalidScope(format!(
                    "'{key}' is not a rendered scope key"
                )))
            }
        };

        let scope = Self::new(decode_component(resource)?, decode_component(scope_id)?)?;
        match filter {
            Some(filter) => Ok(scope.with_filter(decode_component(filter)?)),
            None => Ok(scope),
        }
    }

    /// Parse a queue key previously produced by [`ScopeKey::pending_key`].
    pub fn from_pending_key(key: &str) -> Result<Self> {
        let rest = key.strip_prefix(PENDING_PREFIX).ok_or_else(|| {
            Error::InvalidScope(format!("'{key}' is not a pending queue key"))
        })?;
        Self::from_storage_key(rest)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.'
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_component(encoded: &str) -> Result<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = encoded
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidScope(format!("truncated escape in '{encoded}'")))?;
                if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(Error::InvalidScope(format!("bad escape '%{hex}'")));
                }
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| Error::InvalidScope(format!("bad escape '%{hex}'")))?;
                out.push(byte);
                i += 3;
            }
            byte if is_unreserved(byte) => {
                out.push(byte);
                i += 1;
            }
            byte => {
                return Err(Error::InvalidScope(format!(
                    "unexpected character '{}' in '{encoded}'",
                    byte as char
                )))
            }
        }
    }

    String::from_utf8(out).map_err(|e| Error::InvalidScope(e.to_string()))
}
