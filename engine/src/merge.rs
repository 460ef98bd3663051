//! Folding writes into cached lists.
//!
//! The persisted cache only ever holds server-confirmed data. Pending writes
//! are laid over it on every read ([`merge_pending`]) and folded into it once
//! confirmed ([`apply_confirmed`]). Keeping the two apart is what stops a
//! write from showing up twice after a reload.

use crate::{OpMethod, PendingOperation, ResponseBody};
use serde_json::{Map, Value};

/// Fields that identify a record, in lookup order.
pub const ID_FIELDS: [&str; 2] = ["id", "_id"];

/// Field set on overlays of unconfirmed writes.
pub const PENDING_FIELD: &str = "pending";

/// Id of a record, if it carries one as a string or number.
pub fn record_id(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    ID_FIELDS.iter().find_map(|field| match map.get(*field)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

/// Cached records with every pending operation laid over them, oldest first.
///
/// Creates are appended. Updates replace the record with the same id, or are
/// appended when no such record is cached.
pub fn merge_pending(records: &[Value], pending: &[PendingOperation]) -> Vec<Value> {
    let mut view = records.to_vec();

    for op in pending {
        let overlay = mark_pending(op.payload.clone());
        let target = match op.method {
            OpMethod::Update => position_of(&view, op.record_id().as_deref()),
            OpMethod::Create => None,
        };
        match target {
            Some(index) => {
                let merged = shallow_merge(view[index].clone(), overlay);
                view[index] = merged;
            }
            None => view.push(overlay),
        }
    }

    view
}

/// Fold a confirmed write into the cached records.
///
/// A list response is authoritative and replaces the cache. A single record
/// with an id replaces the cached record with the same id, or is appended.
/// An empty response, or an acknowledgement carrying no id, falls back to
/// the payload that was sent.
pub fn apply_confirmed(
    records: Vec<Value>,
    op: &PendingOperation,
    response: ResponseBody,
) -> Vec<Value> {
    match response {
        ResponseBody::List(items) => items,
        ResponseBody::Single(item) if record_id(&item).is_some() => {
            upsert(records, strip_pending(item), false)
        }
        ResponseBody::Single(_) | ResponseBody::Empty => {
            upsert(records, strip_pending(op.payload.clone()), true)
        }
    }
}

fn upsert(mut records: Vec<Value>, item: Value, merge_fields: bool) -> Vec<Value> {
    match position_of(&records, record_id(&item).as_deref()) {
        Some(index) if merge_fields => {
            let merged = shallow_merge(records[index].clone(), item);
            records[index] = merged;
        }
        Some(index) => records[index] = item,
        None => records.push(item),
    }
    records
}

fn position_of(records: &[Value], id: Option<&str>) -> Option<usize> {
    let id = id?;
    records
        .iter()
        .position(|record| record_id(record).as_deref() == Some(id))
}

fn mark_pending(payload: Value) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    };
    map.insert(PENDING_FIELD.to_string(), Value::Bool(true));
    Value::Object(map)
}

fn strip_pending(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove(PENDING_FIELD);
    }
    value
}

fn shallow_merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            base.extend(patch);
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}
