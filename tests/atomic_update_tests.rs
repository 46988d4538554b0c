//! Atomic field update integration tests (§4.7), driven through
//! `Database::atomic_update` so the per-document exclusive latch and WAL
//! logging are exercised, not just the bare `apply`/`apply_multiple` math.

use std::collections::BTreeMap;
use std::sync::Arc;
use vellumdb_core::{AtomicOp, Database, MemoryStore, StoreConfig, Value};

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
fn push_and_pull_mutate_an_array_field() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    let mut data = BTreeMap::new();
    data.insert("tags".to_string(), Value::Array(vec![Value::String("a".into())]));
    let doc = db.insert("posts", data).unwrap();

    let updated = db
        .atomic_update(
            "posts",
            &doc.id,
            &[AtomicOp::Push { path: "tags".into(), value: Value::String("b".into()) }],
        )
        .unwrap();
    assert_eq!(
        updated.data.get("tags"),
        Some(&Value::Array(vec![Value::String("a".into()), Value::String("b".into())]))
    );

    let updated = db
        .atomic_update(
            "posts",
            &doc.id,
            &[AtomicOp::Pull { path: "tags".into(), value: Value::String("a".into()) }],
        )
        .unwrap();
    assert_eq!(updated.data.get("tags"), Some(&Value::Array(vec![Value::String("b".into())])));
}

#[test]
fn multiple_ops_apply_all_or_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    let mut data = BTreeMap::new();
    data.insert("count".to_string(), Value::Int64(0));
    data.insert("flag".to_string(), Value::Bool(false));
    let doc = db.insert("counters", data).unwrap();

    let updated = db
        .atomic_update(
            "counters",
            &doc.id,
            &[
                AtomicOp::Increment { path: "count".into(), by: 5.0 },
                AtomicOp::Set { path: "flag".into(), value: Value::Bool(true) },
            ],
        )
        .unwrap();
    assert_eq!(updated.data.get("count"), Some(&Value::Int64(5)));
    assert_eq!(updated.data.get("flag"), Some(&Value::Bool(true)));
    assert_eq!(updated.version, 2);
}

#[test]
fn unset_removes_the_field() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    let mut data = BTreeMap::new();
    data.insert("temp".to_string(), Value::Int64(1));
    let doc = db.insert("users", data).unwrap();

    let updated = db
        .atomic_update("users", &doc.id, &[AtomicOp::Unset { path: "temp".into() }])
        .unwrap();
    assert_eq!(updated.data.get("temp"), None);
}

#[test]
fn concurrent_increments_on_the_same_document_all_land() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::<MemoryStore>::open_in_memory(cfg(tmp.path())).unwrap());
    let mut data = BTreeMap::new();
    data.insert("count".to_string(), Value::Int64(0));
    let doc = db.insert("counters", data).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let id = doc.id.clone();
            std::thread::spawn(move || {
                db.atomic_update("counters", &id, &[AtomicOp::Increment { path: "count".into(), by: 1.0 }])
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let final_doc = db.get("counters", &doc.id).unwrap().unwrap();
    assert_eq!(final_doc.data.get("count"), Some(&Value::Int64(8)));
}
