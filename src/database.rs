//! Top-level orchestrator wiring the store, WAL, lock manager, transaction
//! coordinator, indexes, GC, and cache together behind one CRUD/query/
//! transaction API (§2, §4).
//!
//! The donor's `DatabaseCore<S: Storage + RawStorage>` plays the same
//! connective role — generic over a storage backend, owning the active
//! transaction table, replaying the WAL on `open`. This version is generic
//! over `DocumentStore` instead of `Storage + RawStorage` and additionally
//! owns the lock manager, deadlock detector, per-collection index managers,
//! GC, and cache that the donor didn't have.

use crate::atomic::{self, AtomicOp};
use crate::cache::DocumentCache;
use crate::config::StoreConfig;
use crate::crypto::{EncryptionKey, KeyRegistry};
use crate::document::{Document, DocumentId};
use crate::error::{Result, StoreError};
use crate::events::NullSink;
use crate::gc::{GarbageCollector, Tombstone};
use crate::index::{IndexDefinition, IndexManager};
use crate::lock::{DeadlockDetector, LockManager, LockMode};
use crate::query::{ExecutionPlan, ParsedQuery, QueryExecutor, QueryResult};
use crate::store::{DocumentStore, HybridStore, MemoryStore};
use crate::transaction::{
    IsolationLevel, Operation, TransactionCoordinator, TransactionGuard, TransactionId,
};
use crate::value::Value;
use crate::wal::{DataPayload, Wal, WalOp};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A snapshot of the engine's vital signs, exposed over the wire as part of
/// a `Command` response (§2.1 `health()`). The sticky-failure flags are
/// observed, never cleared, by this query: a caller decides what "poisoned
/// WAL appender" or "GC sticky failure" should mean for availability.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub active_transactions: usize,
    pub wal_appender_poisoned: bool,
    pub gc_sticky_failure: bool,
    pub deadlock_detector_last_run: Option<chrono::DateTime<Utc>>,
    pub tombstones_pending: usize,
    pub collections: usize,
    pub wal_next_lsn: u64,
    pub cached_documents: usize,
}

pub struct Database<S: DocumentStore> {
    store: S,
    wal: Wal,
    locks: Arc<LockManager>,
    deadlock_detector: Option<DeadlockDetector>,
    coordinator: TransactionCoordinator,
    indexes: DashMap<String, RwLock<IndexManager>>,
    gc: GarbageCollector,
    cache: DocumentCache,
    encryption: Option<RwLock<KeyRegistry>>,
    config: StoreConfig,
}

impl Database<HybridStore> {
    /// Open (creating if absent) a database rooted at `config.data_path`,
    /// replaying the WAL and rebuilding in-memory indexes before returning.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let store = HybridStore::open(config.data_path.clone())?;
        Self::new_with_store(store, config)
    }
}

impl Database<MemoryStore> {
    /// Open an ephemeral, non-persistent database useful for tests and
    /// short-lived embeddings — still WAL-backed so transaction semantics
    /// match the persistent path.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Self::new_with_store(MemoryStore::default(), config)
    }
}

impl<S: DocumentStore> Database<S> {
    fn new_with_store(store: S, config: StoreConfig) -> Result<Self> {
        let (wal, recovery) = Wal::open(config.wal.clone())?;

        for (txn_id, payload, op) in &recovery.committed_ops {
            Self::replay_one(&store, *txn_id, payload, *op)?;
        }

        let locks = Arc::new(LockManager::new(Arc::new(NullSink)));
        let deadlock_detector = if config.locks.deadlock_detection {
            Some(DeadlockDetector::spawn(locks.clone(), config.locks.detection_interval))
        } else {
            None
        };

        let indexes = DashMap::new();
        for collection in store.get_collections() {
            let mut mgr = IndexManager::default();
            mgr.create(
                IndexDefinition {
                    name: format!("{collection}._id"),
                    fields: vec!["_id".to_string()],
                    unique: true,
                    sparse: false,
                },
                store.get_all(&collection)?.into_iter(),
            )
            .ok();
            indexes.insert(collection, RwLock::new(mgr));
        }

        let gc = GarbageCollector::new(config.gc.enabled, config.gc.retention, config.gc.max_per_run);
        let cache = DocumentCache::new(config.cache.max_items, config.cache.max_bytes, config.cache.ttl);
        let encryption = match &config.encryption.key {
            Some(hex) => {
                let bytes = decode_hex_key(hex)?;
                let key_id = config.encryption.key_id.clone().unwrap_or_else(|| "default".to_string());
                Some(RwLock::new(KeyRegistry::new(EncryptionKey::new(key_id, bytes))))
            }
            None => None,
        };

        Ok(Database {
            store,
            wal,
            locks,
            deadlock_detector,
            coordinator: TransactionCoordinator::default(),
            indexes,
            gc,
            cache,
            encryption,
            config,
        })
    }

    fn replay_one(store: &S, _txn_id: TransactionId, payload: &DataPayload, op: WalOp) -> Result<()> {
        if !store.get_collections().contains(&payload.collection) {
            store.create_collection(&payload.collection)?;
        }
        match op {
            WalOp::Insert => {
                if let Some(after) = &payload.after {
                    let doc: Document = document_from_json(after)?;
                    store.insert(&payload.collection, doc).or_else(|e| {
                        if matches!(e, StoreError::DocumentAlreadyExists { .. }) {
                            Ok(())
                        } else {
                            Err(e)
                        }
                    })?;
                }
            }
            WalOp::Update => {
                if let Some(after) = &payload.after {
                    let doc: Document = document_from_json(after)?;
                    store.replace(&payload.collection, doc)?;
                }
            }
            WalOp::Delete => {
                if let Some(before) = &payload.before {
                    let doc: Document = document_from_json(before)?;
                    store.delete(&payload.collection, &doc.id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            active_transactions: self.coordinator.active_count(),
            wal_appender_poisoned: self.wal.is_appender_poisoned(),
            gc_sticky_failure: self.gc.has_sticky_failure(),
            deadlock_detector_last_run: self.deadlock_detector.as_ref().and_then(|d| d.last_run()),
            tombstones_pending: self.gc.tombstone_count(),
            collections: self.store.get_collections().len(),
            wal_next_lsn: self.wal.next_lsn(),
            cached_documents: self.cache.len(),
        }
    }

    pub fn create_collection(&self, name: &str) -> Result<()> {
        self.store.create_collection(name)?;
        self.indexes.entry(name.to_string()).or_insert_with(|| RwLock::new(IndexManager::default()));
        Ok(())
    }

    pub fn drop_collection(&self, name: &str) -> Result<()> {
        if self.gc.is_enabled() {
            for doc in self.store.get_all(name)? {
                self.gc.record_deletion(Tombstone {
                    collection: name.to_string(),
                    document_id: doc.id.as_string(),
                    version: doc.version,
                    deleted_at: Utc::now(),
                    file_path: None,
                    transaction_id: None,
                });
            }
        }
        self.store.drop_collection(name)?;
        self.indexes.remove(name);
        self.cache.invalidate_collection(name);
        Ok(())
    }

    /// Insert a document outside an explicit transaction: wraps the write in
    /// a single-operation auto-commit transaction so every mutation goes
    /// through the same WAL/lock path regardless of caller.
    pub fn insert(&self, collection: &str, mut data: std::collections::BTreeMap<String, Value>) -> Result<Document> {
        if !self.store.get_collections().contains(&collection.to_string()) {
            self.create_collection(collection)?;
        }
        let id = match data.remove("_id") {
            Some(Value::String(s)) if !s.is_empty() => DocumentId::String(s),
            Some(Value::Int64(i)) => DocumentId::Int(i),
            _ => DocumentId::new_object_id(),
        };
        let doc = Document::new_inserted(id, data, Utc::now());

        let resource = format!("{collection}:{}", doc.id.as_string());
        let txn_id = self.coordinator.begin(IsolationLevel::ReadCommitted);
        let result = (|| {
            self.locks.acquire(txn_id, &resource, LockMode::Exclusive, None)?;
            self.wal.begin(txn_id)?;
            let after: serde_json::Value = doc.to_value().into();
            self.wal.log_insert(
                txn_id,
                &DataPayload {
                    collection: collection.to_string(),
                    before: None,
                    after: Some(after),
                },
            )?;
            self.coordinator.commit(txn_id, |_ops| {
                self.store.insert(collection, doc.clone())?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_insert(&doc)?;
                }
                Ok(())
            })?;
            self.wal.commit(txn_id)?;
            self.cache.put(collection, doc.clone());
            Ok(doc)
        })();
        self.locks.release(txn_id, &resource);
        if result.is_err() {
            let _ = self.coordinator.abort(txn_id, "auto-commit insert failed");
        }
        result
    }

    pub fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        if let Some(doc) = self.cache.get(collection, &id.as_string()) {
            return Ok(Some(doc));
        }
        let doc = self.store.get(collection, id)?;
        if let Some(doc) = &doc {
            self.cache.put(collection, doc.clone());
        }
        Ok(doc)
    }

    pub fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        data: std::collections::BTreeMap<String, Value>,
    ) -> Result<Document> {
        let resource = format!("{collection}:{}", id.as_string());
        let txn_id = self.coordinator.begin(IsolationLevel::ReadCommitted);
        let result = (|| {
            self.locks.acquire(txn_id, &resource, LockMode::Exclusive, None)?;
            let before = self
                .store
                .get(collection, id)?
                .ok_or_else(|| StoreError::DocumentNotFound {
                    collection: collection.to_string(),
                    id: id.as_string(),
                })?;
            let mut after = before.clone();
            after.apply_update(Some(data), Utc::now());

            self.wal.begin(txn_id)?;
            self.wal.log_update(
                txn_id,
                &DataPayload {
                    collection: collection.to_string(),
                    before: Some(before.to_value().into()),
                    after: Some(after.to_value().into()),
                },
            )?;
            self.coordinator.commit(txn_id, |_ops| {
                self.store.replace(collection, after.clone())?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_update(&before, &after)?;
                }
                Ok(())
            })?;
            self.wal.commit(txn_id)?;
            self.cache.put(collection, after.clone());
            Ok(after)
        })();
        self.locks.release(txn_id, &resource);
        if result.is_err() {
            let _ = self.coordinator.abort(txn_id, "auto-commit update failed");
        }
        result
    }

    pub fn delete(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        let resource = format!("{collection}:{}", id.as_string());
        let txn_id = self.coordinator.begin(IsolationLevel::ReadCommitted);
        let result = (|| {
            self.locks.acquire(txn_id, &resource, LockMode::Exclusive, None)?;
            let before = match self.store.get(collection, id)? {
                Some(doc) => doc,
                None => return Ok(false),
            };

            self.wal.begin(txn_id)?;
            self.wal.log_delete(
                txn_id,
                &DataPayload {
                    collection: collection.to_string(),
                    before: Some(before.to_value().into()),
                    after: None,
                },
            )?;
            self.coordinator.commit(txn_id, |_ops| {
                self.store.delete(collection, id)?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_remove(&before);
                }
                Ok(())
            })?;
            self.wal.commit(txn_id)?;
            self.cache.invalidate(collection, &id.as_string());
            if self.gc.is_enabled() {
                self.gc.record_deletion(Tombstone {
                    collection: collection.to_string(),
                    document_id: id.as_string(),
                    version: before.version,
                    deleted_at: Utc::now(),
                    file_path: None,
                    transaction_id: None,
                });
            }
            Ok(true)
        })();
        self.locks.release(txn_id, &resource);
        if result.is_err() {
            let _ = self.coordinator.abort(txn_id, "auto-commit delete failed");
        } else if matches!(result, Ok(false)) {
            let _ = self.coordinator.abort(txn_id, "document not found");
        }
        result
    }

    /// Apply a batch of atomic field operations to one document under a
    /// single exclusive latch (§4.7).
    pub fn atomic_update(&self, collection: &str, id: &DocumentId, ops: &[AtomicOp]) -> Result<Document> {
        let resource = format!("{collection}:{}", id.as_string());
        let txn_id = self.coordinator.begin(IsolationLevel::ReadCommitted);
        let result = (|| {
            self.locks.acquire(txn_id, &resource, LockMode::Exclusive, None)?;
            let before = self
                .store
                .get(collection, id)?
                .ok_or_else(|| StoreError::DocumentNotFound {
                    collection: collection.to_string(),
                    id: id.as_string(),
                })?;
            let mut root = before.to_value();
            for op in ops {
                atomic::apply(&mut root, op)?;
            }
            let new_data = match root {
                Value::Object(map) => map,
                _ => unreachable!("Document::to_value always returns Object"),
            };
            let mut after = before.clone();
            after.apply_update(Some(new_data), Utc::now());

            self.wal.begin(txn_id)?;
            self.wal.log_update(
                txn_id,
                &DataPayload {
                    collection: collection.to_string(),
                    before: Some(before.to_value().into()),
                    after: Some(after.to_value().into()),
                },
            )?;
            self.coordinator.commit(txn_id, |_ops| {
                self.store.replace(collection, after.clone())?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_update(&before, &after)?;
                }
                Ok(())
            })?;
            self.wal.commit(txn_id)?;
            self.cache.put(collection, after.clone());
            Ok(after)
        })();
        self.locks.release(txn_id, &resource);
        if result.is_err() {
            let _ = self.coordinator.abort(txn_id, "auto-commit atomic update failed");
        }
        result
    }

    pub fn create_index(&self, collection: &str, def: IndexDefinition) -> Result<()> {
        let docs = self.store.get_all(collection)?;
        let entry = self.indexes.entry(collection.to_string()).or_insert_with(|| RwLock::new(IndexManager::default()));
        let result = entry.write().create(def, docs.into_iter());
        result
    }

    pub fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        let entry = self
            .indexes
            .get(collection)
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))?;
        let mut guard = entry.write();
        IndexManager::drop(&mut guard, name)
    }

    pub fn index_type_name(&self, collection: &str, name: &str) -> Option<String> {
        self.indexes
            .get(collection)
            .and_then(|mgr| mgr.read().get(name).map(|idx| idx.def.type_name()))
    }

    pub fn query(&self, query: &ParsedQuery) -> Result<QueryResult> {
        let docs = self.store.get_all(&query.collection)?;
        let empty = IndexManager::default();
        match self.indexes.get(&query.collection) {
            Some(mgr) => QueryExecutor::execute(query, &docs, &mgr.read()),
            None => QueryExecutor::execute(query, &docs, &empty),
        }
    }

    pub fn explain(&self, query: &ParsedQuery) -> Result<ExecutionPlan> {
        let docs = self.store.get_all(&query.collection)?;
        let empty = IndexManager::default();
        Ok(match self.indexes.get(&query.collection) {
            Some(mgr) => QueryExecutor::explain(query, &docs, &mgr.read()),
            None => QueryExecutor::explain(query, &docs, &empty),
        })
    }

    pub fn begin_transaction(&self, isolation: IsolationLevel) -> Result<TransactionId> {
        let txn_id = self.coordinator.begin(isolation);
        self.wal.begin(txn_id)?;
        Ok(txn_id)
    }

    pub fn transaction_guard(&self, isolation: IsolationLevel) -> Result<(TransactionId, TransactionGuard<'_>)> {
        let id = self.begin_transaction(isolation)?;
        Ok((id, TransactionGuard::new(&self.coordinator, id)))
    }

    /// Stage a write inside an already-open transaction without applying it
    /// to the store yet; the store mutation happens at `commit_transaction`.
    pub fn record_in_transaction(&self, txn_id: TransactionId, op: Operation) -> Result<()> {
        match &op {
            Operation::Insert { collection, after, .. } => {
                self.wal.log_insert(
                    txn_id,
                    &DataPayload {
                        collection: collection.clone(),
                        before: None,
                        after: Some(after.clone()),
                    },
                )?;
            }
            Operation::Update { collection, before, after, .. } => {
                self.wal.log_update(
                    txn_id,
                    &DataPayload {
                        collection: collection.clone(),
                        before: Some(before.clone()),
                        after: Some(after.clone()),
                    },
                )?;
            }
            Operation::Delete { collection, before, .. } => {
                self.wal.log_delete(
                    txn_id,
                    &DataPayload {
                        collection: collection.clone(),
                        before: Some(before.clone()),
                        after: None,
                    },
                )?;
            }
        }
        self.coordinator.record_write(txn_id, op)
    }

    pub fn commit_transaction(&self, txn_id: TransactionId) -> Result<()> {
        self.coordinator.commit(txn_id, |ops| {
            for op in ops {
                self.apply_operation(op)?;
            }
            Ok(())
        })?;
        self.wal.commit(txn_id)?;
        Ok(())
    }

    pub fn rollback_transaction(&self, txn_id: TransactionId) -> Result<()> {
        self.coordinator.rollback(txn_id)?;
        self.wal.rollback_marker(txn_id)?;
        Ok(())
    }

    fn apply_operation(&self, op: &Operation) -> Result<()> {
        match op {
            Operation::Insert { collection, after, .. } => {
                let doc = document_from_json(after)?;
                self.store.insert(collection, doc.clone())?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_insert(&doc)?;
                }
            }
            Operation::Update { collection, before, after, .. } => {
                let before_doc = document_from_json(before)?;
                let after_doc = document_from_json(after)?;
                self.store.replace(collection, after_doc.clone())?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_update(&before_doc, &after_doc)?;
                }
            }
            Operation::Delete { collection, before, .. } => {
                let before_doc = document_from_json(before)?;
                self.store.delete(collection, &before_doc.id)?;
                if let Some(mgr) = self.indexes.get(collection) {
                    mgr.write().on_remove(&before_doc);
                }
            }
        }
        Ok(())
    }

    /// Apply a batch of single-document operations against one collection
    /// best-effort (§2.2, §4.9 `BulkOperation`): each item runs as its own
    /// auto-commit write, so one item's failure doesn't block the rest, and
    /// the caller gets back a per-item `{ok, error?}` result in submission
    /// order.
    pub fn bulk_operation(
        &self,
        payload: &crate::protocol::BulkOperationPayload,
    ) -> crate::protocol::BulkOperationResponse {
        use crate::protocol::{BulkOpKind, BulkOpResult, ErrorPayload};

        let results = payload
            .ops
            .iter()
            .map(|item| {
                let outcome = match item.kind {
                    BulkOpKind::Insert => {
                        let data = item
                            .document
                            .clone()
                            .ok_or_else(|| StoreError::ArgumentInvalid("insert requires a document".into()))
                            .and_then(|json| object_fields(&json));
                        data.and_then(|data| self.insert(&payload.collection, data)).map(|_| ())
                    }
                    BulkOpKind::Update => {
                        let id = item
                            .id
                            .clone()
                            .ok_or_else(|| StoreError::ArgumentInvalid("update requires an id".into()))
                            .map(DocumentId::from);
                        let data = item
                            .document
                            .clone()
                            .ok_or_else(|| StoreError::ArgumentInvalid("update requires a document".into()))
                            .and_then(|json| object_fields(&json));
                        id.and_then(|id| data.and_then(|data| self.update(&payload.collection, &id, data)))
                            .map(|_| ())
                    }
                    BulkOpKind::Delete => match item.id.clone() {
                        None => Err(StoreError::ArgumentInvalid("delete requires an id".into())),
                        Some(id_str) => {
                            let doc_id = DocumentId::from(id_str.clone());
                            self.delete(&payload.collection, &doc_id).and_then(|found| {
                                if found {
                                    Ok(())
                                } else {
                                    Err(StoreError::DocumentNotFound {
                                        collection: payload.collection.clone(),
                                        id: id_str,
                                    })
                                }
                            })
                        }
                    },
                };
                match outcome {
                    Ok(()) => BulkOpResult { ok: true, error: None },
                    Err(e) => BulkOpResult {
                        ok: false,
                        error: Some(ErrorPayload {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        }),
                    },
                }
            })
            .collect();
        crate::protocol::BulkOperationResponse { results }
    }

    pub fn run_gc_once(&self) -> crate::gc::CollectionRun {
        self.gc.run_once(&AtomicBool::new(false))
    }

    pub fn checkpoint(&self) -> Result<()> {
        self.wal.checkpoint()
    }

    /// Encrypt `plaintext` under the configured active key (§4.10). Errs if
    /// `config.encryption.key` was not set at open time.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<(String, Vec<u8>)> {
        self.encryption_registry()?.read().encrypt(plaintext)
    }

    /// Decrypt a blob sealed under `key_id`, which may be a retired key
    /// still held for records written before a rotation.
    pub fn decrypt_bytes(&self, key_id: &str, sealed: &[u8]) -> Result<Vec<u8>> {
        self.encryption_registry()?.read().decrypt(key_id, sealed)
    }

    /// Generate a fresh key and make it active; previously active keys
    /// remain available for decrypting older records.
    pub fn rotate_encryption_key(&self, new_key_id: &str) -> Result<()> {
        self.encryption_registry()?.write().rotate(EncryptionKey::generate(new_key_id));
        Ok(())
    }

    fn encryption_registry(&self) -> Result<&RwLock<KeyRegistry>> {
        self.encryption
            .as_ref()
            .ok_or_else(|| StoreError::EncryptionError("encryption not configured".into()))
    }
}

/// Decode a hex-encoded 32-byte `EncryptionConfig::key` string.
fn decode_hex_key(hex: &str) -> Result<[u8; crate::crypto::KEY_LEN]> {
    if hex.len() != crate::crypto::KEY_LEN * 2 {
        return Err(StoreError::EncryptionError(format!(
            "encryption key must be {} hex characters, got {}",
            crate::crypto::KEY_LEN * 2,
            hex.len()
        )));
    }
    let mut bytes = [0u8; crate::crypto::KEY_LEN];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| StoreError::EncryptionError("invalid hex in encryption key".into()))?;
    }
    Ok(bytes)
}

/// Convert a JSON object into the field map `insert`/`update` expect,
/// rejecting non-object payloads.
fn object_fields(value: &serde_json::Value) -> Result<std::collections::BTreeMap<String, Value>> {
    match Value::from(value) {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::ParseError("document must be an object".into())),
    }
}

fn document_from_json(value: &serde_json::Value) -> Result<Document> {
    let v: Value = value.into();
    let mut map = match v {
        Value::Object(map) => map,
        _ => return Err(StoreError::ParseError("document must be an object".into())),
    };
    let id = match map.remove("_id") {
        Some(Value::String(s)) => DocumentId::String(s),
        Some(Value::Int64(i)) => DocumentId::Int(i),
        _ => return Err(StoreError::ParseError("document missing _id".into())),
    };
    let version = match map.remove("_version") {
        Some(Value::Int64(v)) => v as u64,
        _ => 1,
    };
    map.remove("_createdAt");
    map.remove("_updatedAt");
    Ok(Document {
        id,
        data: map,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cfg(tmp: &Path) -> StoreConfig {
        let mut config = StoreConfig {
            data_path: tmp.join("data"),
            wal: crate::config::WalConfig {
                dir: tmp.join("wal"),
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
    fn insert_then_get_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let mut data = BTreeMap::new();
        data.insert("name".to_string(), Value::String("Alice".into()));
        let doc = db.insert("users", data).unwrap();
        let fetched = db.get("users", &doc.id).unwrap().unwrap();
        assert_eq!(fetched.data.get("name"), Some(&Value::String("Alice".into())));
    }

    #[test]
    fn update_bumps_version() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let doc = db.insert("users", BTreeMap::new()).unwrap();
        let mut data = BTreeMap::new();
        data.insert("age".to_string(), Value::Int64(30));
        let updated = db.update("users", &doc.id, data).unwrap();
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn delete_removes_document_and_records_tombstone() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let doc = db.insert("users", BTreeMap::new()).unwrap();
        assert!(db.delete("users", &doc.id).unwrap());
        assert!(db.get("users", &doc.id).unwrap().is_none());
        assert_eq!(db.health().tombstones_pending, 1);
    }

    #[test]
    fn atomic_increment_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let mut data = BTreeMap::new();
        data.insert("count".to_string(), Value::Int64(1));
        let doc = db.insert("counters", data).unwrap();
        let updated = db
            .atomic_update(
                "counters",
                &doc.id,
                &[AtomicOp::Increment { path: "count".into(), by: 1.0 }],
            )
            .unwrap();
        assert_eq!(updated.data.get("count"), Some(&Value::Int64(2)));
    }

    #[test]
    fn create_index_then_query_uses_index_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let mut data = BTreeMap::new();
        data.insert("email".to_string(), Value::String("a@example.com".into()));
        db.insert("users", data).unwrap();
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
        let query = crate::query::parser::parse_query(&serde_json::json!({
            "collection": "users",
            "filter": {"email": "a@example.com"}
        }))
        .unwrap();
        let plan = db.explain(&query).unwrap();
        assert_eq!(plan, ExecutionPlan::IndexScan { index_name: "by_email".into() });
    }

    #[test]
    fn drop_collection_invalidates_cache_and_indexes() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        db.insert("users", BTreeMap::new()).unwrap();
        db.drop_collection("users").unwrap();
        assert_eq!(db.store.get_collections().len(), 0);
    }

    #[test]
    fn encryption_disabled_by_default_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        assert!(db.encrypt_bytes(b"secret").is_err());
    }

    #[test]
    fn configured_key_roundtrips_and_rotation_keeps_old_key_readable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = cfg(tmp.path());
        config.encryption.key = Some("11".repeat(32));
        config.encryption.key_id = Some("v1".into());
        let db = Database::open_in_memory(config).unwrap();

        let (key_id, sealed) = db.encrypt_bytes(b"hello").unwrap();
        assert_eq!(key_id, "v1");
        assert_eq!(db.decrypt_bytes(&key_id, &sealed).unwrap(), b"hello");

        db.rotate_encryption_key("v2").unwrap();
        let (new_key_id, _) = db.encrypt_bytes(b"world").unwrap();
        assert_eq!(new_key_id, "v2");
        assert_eq!(db.decrypt_bytes(&key_id, &sealed).unwrap(), b"hello");
    }

    #[test]
    fn bulk_operation_reports_per_item_results() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory(cfg(tmp.path())).unwrap();
        let payload = crate::protocol::BulkOperationPayload {
            collection: "users".into(),
            ops: vec![
                crate::protocol::BulkOpItem {
                    kind: crate::protocol::BulkOpKind::Insert,
                    id: None,
                    document: Some(serde_json::json!({"name": "Alice"})),
                },
                crate::protocol::BulkOpItem {
                    kind: crate::protocol::BulkOpKind::Delete,
                    id: Some("missing".into()),
                    document: None,
                },
            ],
        };
        let response = db.bulk_operation(&payload);
        assert_eq!(response.results.len(), 2);
        assert!(response.results[0].ok);
        assert!(!response.results[1].ok);
    }
}
