//! Edge case tests for skul-sync-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use serde_json::{json, Value};
use skul_sync_engine::{
    apply_confirmed, merge_pending, CacheStore, KeyValueStorage, MemoryStorage, OpMethod,
    PendingOperation, PendingQueue, ResponseBody, ScopeKey,
};

fn payments_scope() -> ScopeKey {
    ScopeKey::new("payments", "123")
        .unwrap()
        .with_filter("FIRST_TERM")
}

fn payment(n: u64) -> PendingOperation {
    PendingOperation::new(
        &payments_scope(),
        OpMethod::Create,
        "/api/finance/payments",
        json!({"amountPaid": n, "term": "FIRST_TERM"}),
        format!("idem-{n}"),
        1706745600000 + n,
    )
}

// ============================================================================
// Key Edge Cases
// ============================================================================

#[test]
fn unicode_scope_components() {
    let storage = MemoryStorage::new();
    let cache = CacheStore::new(storage.clone());

    let names = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "Null\0Test",
    ];

    for (i, name) in names.iter().enumerate() {
        let scope = ScopeKey::new("students", *name).unwrap();
        cache.write(&scope, vec![json!({"id": i})], 1000).unwrap();

        let key = scope.storage_key();
        assert!(key.is_ascii(), "key not ascii for: {name}");
        assert_eq!(ScopeKey::from_storage_key(&key).unwrap(), scope);
        assert_eq!(
            cache.read(&scope).unwrap().unwrap().payload,
            vec![json!({"id": i})]
        );
    }

    assert_eq!(storage.keys().unwrap().len(), names.len());
}

#[test]
fn path_like_scope_ids_stay_flat() {
    let scope = ScopeKey::new("students", "../../etc/passwd").unwrap();
    let key = scope.storage_key();
    assert!(!key.contains('/'));
}

// ============================================================================
// Payload Edge Cases
// ============================================================================

#[test]
fn very_large_payload() {
    let cache = CacheStore::new(MemoryStorage::new());
    let scope = ScopeKey::new("students", "55").unwrap();

    // 1MB string
    let long_string = "x".repeat(1024 * 1024);
    cache
        .write(&scope, vec![json!({"bio": long_string.clone()})], 1000)
        .unwrap();

    let cached = cache.read(&scope).unwrap().unwrap();
    assert_eq!(cached.payload[0]["bio"].as_str().unwrap().len(), 1024 * 1024);
}

#[test]
fn cached_payload_is_byte_for_byte_stable() {
    let cache = CacheStore::new(MemoryStorage::new());
    let scope = ScopeKey::new("students", "55").unwrap();

    let records = vec![json!({
        "string": "hello",
        "number": 42,
        "float": 3.14159,
        "bool_true": true,
        "null": null,
        "array": [1, 2, 3, "mixed", true, null],
        "object": {"a": 1, "b": "two"},
        "empty_array": [],
        "empty_object": {},
    })];

    cache.write(&scope, records.clone(), 1000).unwrap();
    let cached = cache.read(&scope).unwrap().unwrap();

    assert_eq!(
        serde_json::to_string(&cached.payload).unwrap(),
        serde_json::to_string(&records).unwrap()
    );
}

#[test]
fn every_response_shape_normalises_to_a_list() {
    let shapes = vec![
        json!([{"id": 1}]),
        json!({"data": [{"id": 1}]}),
        json!({"students": [{"id": 1}]}),
        json!({"teachers": [{"id": 1}]}),
        json!({"records": [{"id": 1}]}),
    ];

    for shape in shapes {
        let records = ResponseBody::from_json(shape.clone()).unwrap().into_records();
        assert_eq!(records, vec![json!({"id": 1})], "shape {shape}");
    }
}

// ============================================================================
// Queue Edge Cases
// ============================================================================

#[test]
fn queues_are_independent_per_scope() {
    let queue = PendingQueue::new(MemoryStorage::new());
    let second_term = ScopeKey::new("payments", "123")
        .unwrap()
        .with_filter("SECOND_TERM");

    queue.enqueue(payment(1)).unwrap();
    queue
        .enqueue(PendingOperation::new(
            &second_term,
            OpMethod::Create,
            "/api/finance/payments",
            json!({"amountPaid": 9}),
            "idem-other",
            1,
        ))
        .unwrap();

    queue.drain(&payments_scope()).unwrap();

    assert!(queue.is_empty(&payments_scope()).unwrap());
    assert_eq!(queue.len(&second_term).unwrap(), 1);
}

#[test]
fn many_operations_keep_order() {
    let queue = PendingQueue::new(MemoryStorage::new());
    for n in 0..500 {
        queue.enqueue(payment(n)).unwrap();
    }

    let ops = queue.peek_all(&payments_scope()).unwrap();
    assert_eq!(ops.len(), 500);
    assert!(ops.windows(2).all(|w| w[0].enqueued_at < w[1].enqueued_at));
}

#[test]
fn foreign_pending_keys_are_skipped() {
    let storage = MemoryStorage::new();
    storage.set("pending_not a scope", "[]").unwrap();
    let queue = PendingQueue::new(storage);
    queue.enqueue(payment(1)).unwrap();

    assert_eq!(queue.scopes().unwrap(), vec![payments_scope()]);
}

#[test]
fn corrupt_queue_is_an_error_not_an_empty_queue() {
    let storage = MemoryStorage::new();
    storage
        .set(&payments_scope().pending_key(), "{\"half\":")
        .unwrap();
    let queue = PendingQueue::new(storage);

    assert!(queue.peek_all(&payments_scope()).is_err());
}

// ============================================================================
// Merge Edge Cases
// ============================================================================

#[test]
fn offline_payment_scenario() {
    let storage = MemoryStorage::new();
    let cache = CacheStore::new(storage.clone());
    let queue = PendingQueue::new(storage);

    // Nothing cached, one payment queued while offline.
    queue.enqueue(payment(2000)).unwrap();
    let view = merge_pending(&[], &queue.peek_all(&payments_scope()).unwrap());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0]["pending"], json!(true));
    assert_eq!(view[0]["amountPaid"], json!(2000));

    // Server confirms it.
    let op = queue.front(&payments_scope()).unwrap().unwrap();
    let confirmed = apply_confirmed(
        Vec::new(),
        &op,
        ResponseBody::Single(json!({"id": "p-1", "amountPaid": 2000, "term": "FIRST_TERM"})),
    );
    cache.write(&payments_scope(), confirmed, 2000).unwrap();
    queue
        .acknowledge(&payments_scope(), &op.idempotency_key)
        .unwrap();

    let cached = cache.read(&payments_scope()).unwrap().unwrap();
    let view = merge_pending(&cached.payload, &queue.peek_all(&payments_scope()).unwrap());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].get("pending"), None::<&Value>);
}

#[test]
fn repeated_updates_to_one_record_collapse() {
    let scope = ScopeKey::new("students", "55").unwrap();
    let records = vec![json!({"id": 9, "class": "JSS1", "name": "Ada"})];

    let pending: Vec<_> = ["JSS2", "JSS3"]
        .iter()
        .enumerate()
        .map(|(i, class)| {
            PendingOperation::new(
                &scope,
                OpMethod::Update,
                "/api/students/9",
                json!({"id": 9, "class": class}),
                format!("idem-{i}"),
                i as u64,
            )
        })
        .collect();

    let view = merge_pending(&records, &pending);
    assert_eq!(
        view,
        vec![json!({"id": 9, "class": "JSS3", "name": "Ada", "pending": true})]
    );
}
