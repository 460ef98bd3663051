//! Pending write operations.
//!
//! A write that could not be confirmed by the server is kept as a
//! [`PendingOperation`] until it is replayed successfully.

use crate::{IdempotencyKey, ScopeKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of write. Deletes are never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpMethod {
    Create,
    Update,
}

impl OpMethod {
    /// HTTP verb used to send this operation.
    pub fn http_verb(&self) -> &'static str {
        match self {
            OpMethod::Create => "POST",
            OpMethod::Update => "PUT",
        }
    }
}

impl fmt::Display for OpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpMethod::Create => write!(f, "CREATE"),
            OpMethod::Update => write!(f, "UPDATE"),
        }
    }
}

/// A write awaiting server confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Server-assigned id, absent while pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Rendered storage key of the owning scope
    pub scope_key: String,
    /// Create or update
    pub method: OpMethod,
    /// Resource path the write is sent to
    pub path: String,
    /// Request body
    pub payload: serde_json::Value,
    /// Client-generated token the server deduplicates replays by
    pub idempotency_key: IdempotencyKey,
    /// When the operation was queued (milliseconds since epoch)
    pub enqueued_at: Timestamp,
    /// Shown to the UI until the server confirms
    pub pending: bool,
}

impl PendingOperation {
    /// Create a new pending operation for a scope.
    pub fn new(
        scope: &ScopeKey,
        method: OpMethod,
        path: impl Into<String>,
        payload: serde_json::Value,
        idempotency_key: impl Into<IdempotencyKey>,
        enqueued_at: Timestamp,
    ) -> Self {
        Self {
            id: None,
            scope_key: scope.storage_key(),
            method,
            path: path.into(),
            payload,
            idempotency_key: idempotency_key.into(),
            enqueued_at,
            pending: true,
        }
    }

    /// Mark as confirmed by the server.
    pub fn confirm(&mut self, server_id: Option<String>) {
        self.pending = false;
        if server_id.is_some() {
            self.id = server_id;
        }
    }

    /// Id of the record this operation targets, if the payload carries one.
    pub fn record_id(&self) -> Option<String> {
        crate::merge::record_id(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> ScopeKey {
        ScopeKey::new("payments", "123").unwrap().with_filter("FIRST-TERM")
    }

    #[test]
    fn create_op() {
        let op = PendingOperation::new(
            &scope(),
            OpMethod::Create,
            "/api/finance/payments",
            json!({"amountPaid": 2000}),
            "idem-1",
            1000,
        );

        assert_eq!(op.scope_key, "payments_123_FIRST-TERM");
        assert_eq!(op.method, OpMethod::Create);
        assert!(op.pending);
        assert!(op.id.is_none());
    }

    #[test]
    fn confirm_clears_pending() {
        let mut op = PendingOperation::new(
            &scope(),
            OpMethod::Create,
            "/p",
            json!({}),
            "idem-1",
            1000,
        );
        op.confirm(Some("srv-9".into()));

        assert!(!op.pending);
        assert_eq!(op.id.as_deref(), Some("srv-9"));
    }

    #[test]
    fn http_verbs() {
        assert_eq!(OpMethod::Create.http_verb(), "POST");
        assert_eq!(OpMethod::Update.http_verb(), "PUT");
    }

    #[test]
    fn record_id_from_payload() {
        let op = PendingOperation::new(
            &scope(),
            OpMethod::Update,
            "/p",
            json!({"_id": "abc", "amountPaid": 10}),
            "idem-1",
            1000,
        );
        assert_eq!(op.record_id().as_deref(), Some("abc"));
    }

    #[test]
    fn serialization_format() {
        let op = PendingOperation::new(
            &scope(),
            OpMethod::Update,
            "/p",
            json!({"amountPaid": 10}),
            "idem-1",
            1000,
        );

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"method\":\"UPDATE\""));
        assert!(json.contains("\"idempotencyKey\":\"idem-1\""));
        assert!(json.contains("\"pending\":true"));
        assert!(!json.contains("\"id\""));

        let parsed: PendingOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);
    }
}
