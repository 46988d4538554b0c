//! Tombstone garbage collector integration tests (§4.8), driven through
//! `Database::delete`/`drop_collection`/`run_gc_once`/`health`.

use std::collections::BTreeMap;
use std::time::Duration;
use vellumdb_core::{Database, StoreConfig, Value};

fn cfg(dir: &std::path::Path, retention: Duration) -> StoreConfig {
    let mut config = StoreConfig {
        data_path: dir.join("data"),
        wal: vellumdb_core::config::WalConfig {
            dir: dir.join("wal"),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        },
        gc: vellumdb_core::GcConfig {
            enabled: true,
            retention,
            interval: Duration::from_secs(60),
            max_per_run: 100,
            background: false,
        },
        locks: Default::default(),
        cache: Default::default(),
        encryption: Default::default(),
        network: Default::default(),
    };
    config.locks.deadlock_detection = false;
    config
}

#[test]
fn delete_records_a_tombstone_pending_collection() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path(), Duration::from_secs(3600))).unwrap();
    let doc = db.insert("users", BTreeMap::new()).unwrap();
    assert!(db.delete("users", &doc.id).unwrap());
    assert_eq!(db.health().tombstones_pending, 1);
}

#[test]
fn gc_does_not_reclaim_before_retention_elapses() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path(), Duration::from_secs(3600))).unwrap();
    let doc = db.insert("users", BTreeMap::new()).unwrap();
    db.delete("users", &doc.id).unwrap();

    let run = db.run_gc_once();
    assert_eq!(run.reclaimed, 0);
    assert_eq!(db.health().tombstones_pending, 1);
}

#[test]
fn gc_reclaims_once_retention_has_elapsed() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path(), Duration::from_secs(0))).unwrap();
    let doc = db.insert("users", BTreeMap::new()).unwrap();
    db.delete("users", &doc.id).unwrap();

    let run = db.run_gc_once();
    assert_eq!(run.reclaimed, 1);
    assert_eq!(db.health().tombstones_pending, 0);
}

#[test]
fn dropping_a_collection_tombstones_every_document() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path(), Duration::from_secs(0))).unwrap();
    let mut data = BTreeMap::new();
    data.insert("name".to_string(), Value::String("a".into()));
    db.insert("users", data.clone()).unwrap();
    db.insert("users", data).unwrap();

    db.drop_collection("users").unwrap();
    assert_eq!(db.health().tombstones_pending, 2);
    let run = db.run_gc_once();
    assert_eq!(run.reclaimed, 2);
}
