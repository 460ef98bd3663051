//! Normalisation of remote response bodies.
//!
//! The API answers list reads with either a bare array or an object that
//! wraps the array under one of a few envelope fields. Everything is turned
//! into one canonical shape here, before it reaches the coordinator.

use crate::{error::Result, Error};
use serde_json::Value;

/// Envelope fields that may hold the actual payload.
pub const ENVELOPE_FIELDS: [&str; 4] = ["data", "students", "teachers", "records"];

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A collection of records
    List(Vec<Value>),
    /// A single record (e.g. the echo of a create)
    Single(Value),
    /// No body
    Empty,
}

impl ResponseBody {
    /// Classify a raw JSON body.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ResponseBody::Empty),
            Value::Array(items) => Ok(ResponseBody::List(items)),
            Value::Object(mut map) => {
                for field in ENVELOPE_FIELDS {
                    match map.remove(field) {
                        Some(Value::Array(items)) => return Ok(ResponseBody::List(items)),
                        Some(inner @ Value::Object(_)) => return Ok(ResponseBody::Single(inner)),
                        Some(other) => {
                            map.insert(field.to_string(), other);
                        }
                        None => {}
                    }
                }
                Ok(ResponseBody::Single(Value::Object(map)))
            }
            other => Err(Error::InvalidPayload(format!(
                "expected an array or object, got {other}"
            ))),
        }
    }

    /// Canonical list form.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            ResponseBody::List(items) => items,
            ResponseBody::Single(item) => vec![item],
            ResponseBody::Empty => Vec::new(),
        }
    }
}

/// Extract a human-readable message from an error response body.
///
/// Understands `{"message": ..}` and `{"error": ..}` JSON bodies and falls
/// back to the trimmed plain text.
pub fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(Value::String(message)) = map.get(field) {
                return message.clone();
            }
        }
    }
    body.trim().to_string()
}
