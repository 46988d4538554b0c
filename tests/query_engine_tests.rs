//! Query engine integration tests (§4.6, §2.2): filtering, sorting,
//! pagination, index-accelerated plans, and the distinct/count/exists
//! shortcuts, all driven through `Database::query`/`explain`.

use std::collections::BTreeMap;
use vellumdb_core::{Database, ExecutionPlan, IndexDefinition, StoreConfig, Value};

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

fn seed(db: &Database<vellumdb_core::MemoryStore>) {
    for (email, age) in [("a@x.com", 20), ("b@x.com", 30), ("c@x.com", 30)] {
        let mut data = BTreeMap::new();
        data.insert("email".to_string(), Value::String(email.into()));
        data.insert("age".to_string(), Value::Int64(age));
        db.insert("users", data).unwrap();
    }
}

#[test]
fn range_filter_sorts_and_paginates() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    seed(&db);

    let query = vellumdb_core::query::parser::parse_query(&serde_json::json!({
        "collection": "users",
        "filter": {"age": {"$gte": 20}},
        "sort": {"age": -1},
        "options": {"limit": 2}
    }))
    .unwrap();
    let result = db.query(&query).unwrap();
    assert_eq!(result.total_matched, 3);
    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.documents[0].data.get("age"), Some(&Value::Int64(30)));
}

#[test]
fn equality_on_indexed_field_uses_index_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    seed(&db);
    db.create_index(
        "users",
        IndexDefinition {
            name: "by_email".into(),
            fields: vec!["email".into()],
            unique: true,
            sparse: false,
        },
    )
    .unwrap();

    let query = vellumdb_core::query::parser::parse_query(&serde_json::json!({
        "collection": "users",
        "filter": {"email": "b@x.com"}
    }))
    .unwrap();
    let plan = db.explain(&query).unwrap();
    assert_eq!(plan, ExecutionPlan::IndexScan { index_name: "by_email".into() });

    let result = db.query(&query).unwrap();
    assert_eq!(result.documents.len(), 1);
}

#[test]
fn filter_without_matching_index_falls_back_to_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    seed(&db);

    let query = vellumdb_core::query::parser::parse_query(&serde_json::json!({
        "collection": "users",
        "filter": {"age": {"$lt": 25}}
    }))
    .unwrap();
    assert_eq!(db.explain(&query).unwrap(), ExecutionPlan::CollectionScan);
}

#[test]
fn in_and_not_operators_combine() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
    seed(&db);

    let query = vellumdb_core::query::parser::parse_query(&serde_json::json!({
        "collection": "users",
        "filter": {
            "$and": [
                {"age": {"$in": [20, 30]}},
                {"email": {"$ne": "a@x.com"}}
            ]
        }
    }))
    .unwrap();
    let result = db.query(&query).unwrap();
    assert_eq!(result.documents.len(), 2);
}
