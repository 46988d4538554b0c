//! `BulkOperation` integration tests (§2.2, §4.9): one best-effort batch of
//! insert/update/delete items against a single collection, each reported
//! independently in the response.

use vellumdb_core::protocol::{BulkOpItem, BulkOpKind, BulkOperationPayload};
use vellumdb_core::{Database, StoreConfig};

fn cfg(dir: &std::path::Path) -> StoreConfig {
    let mut config = StoreConfig {
        data_path: dir.join("data"),
        wal: vellumdb_core::config::WalConfig {
            dir: dir.join("wal"),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        },
        gc: Default::default(),
        locks: Default::default(),
        cache: Default::default(),
        encryption: Default::default(),
        network: Default::default(),
    };
    config.locks.deadlock_detection = false;
    config
}

#[test]
fn mixed_batch_reports_one_result_per_item_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    let existing = db.insert("users", Default::default()).unwrap();

    let payload = BulkOperationPayload {
        collection: "users".into(),
        ops: vec![
            BulkOpItem {
                kind: BulkOpKind::Insert,
                id: None,
                document: Some(serde_json::json!({"name": "Alice"})),
            },
            BulkOpItem {
                kind: BulkOpKind::Update,
                id: Some(existing.id.as_string()),
                document: Some(serde_json::json!({"name": "Alice Updated"})),
            },
            BulkOpItem {
                kind: BulkOpKind::Delete,
                id: Some("does-not-exist".into()),
                document: None,
            },
        ],
    };

    let response = db.bulk_operation(&payload);
    assert_eq!(response.results.len(), 3);
    assert!(response.results[0].ok);
    assert!(response.results[1].ok);
    assert!(!response.results[2].ok);
    assert_eq!(response.results[2].error.as_ref().unwrap().code, "DOCUMENT_NOT_FOUND");

    let updated = db.get("users", &existing.id).unwrap().unwrap();
    assert_eq!(
        updated.data.get("name"),
        Some(&vellumdb_core::Value::String("Alice Updated".into()))
    );
}

#[test]
fn one_failing_item_does_not_block_the_rest_of_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();

    let payload = BulkOperationPayload {
        collection: "users".into(),
        ops: vec![
            BulkOpItem { kind: BulkOpKind::Insert, id: None, document: None },
            BulkOpItem {
                kind: BulkOpKind::Insert,
                id: None,
                document: Some(serde_json::json!({"name": "Bob"})),
            },
        ],
    };

    let response = db.bulk_operation(&payload);
    assert!(!response.results[0].ok);
    assert!(response.results[1].ok);
    assert_eq!(db.health().collections, 1);
}

#[test]
fn update_requires_both_id_and_document() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    db.insert("users", Default::default()).unwrap();

    let payload = BulkOperationPayload {
        collection: "users".into(),
        ops: vec![BulkOpItem { kind: BulkOpKind::Update, id: None, document: Some(serde_json::json!({})) }],
    };
    let response = db.bulk_operation(&payload);
    assert!(!response.results[0].ok);
}
