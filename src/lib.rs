//! An embeddable document database: length-framed binary wire protocol,
//! ACID transactions, lock-based concurrency control, write-ahead-logged
//! crash recovery, ad-hoc queries over a classical B-tree index subsystem,
//! and AEAD encryption at rest.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::only_used_in_recursion)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::result_large_err)]
// Tests may have helper functions not used in all test cases
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

pub mod atomic;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod database;
pub mod document;
pub mod error;
pub mod events;
pub mod gc;
pub mod index;
pub mod lock;
pub mod logging;
pub mod protocol;
pub mod query;
pub mod store;
pub mod transaction;
pub mod value;
pub mod wal;

// Public exports
pub use atomic::{apply as apply_atomic_op, apply_multiple as apply_atomic_ops, AtomicOp};
pub use cache::DocumentCache;
pub use config::{
    CacheConfig, EncryptionConfig, GcConfig, LockConfig, NetworkConfig, StoreConfig, WalConfig,
};
pub use database::{Database, HealthSnapshot};
pub use document::{Document, DocumentId};
pub use error::{Result, StoreError};
pub use gc::{CollectionRun, GarbageCollector, Tombstone};
pub use index::{Index, IndexDefinition, IndexManager};
pub use lock::{DeadlockDetector, LockManager, LockMode};
pub use query::{ExecutionPlan, ParsedQuery, QueryExecutor, QueryResult};
pub use store::{DocumentStore, HybridStore, MemoryStore};
pub use transaction::{
    IsolationLevel, Operation, TransactionCoordinator, TransactionGuard, TransactionId,
};
pub use value::Value;
pub use wal::{RecoveryResult, Wal};
