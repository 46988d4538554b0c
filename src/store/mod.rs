//! In-memory document store (§4.1).
//!
//! The donor's `CollectionCore<S: Storage + RawStorage>` is generic over a
//! page-based file storage engine (`storage::file_storage`) or a plain
//! `HashMap`-backed `MemoryStorage`. This module keeps that same
//! memory-vs-persistent split but flattens it to the spec's contract: a
//! `DocumentStore` trait with a `MemoryStore` implementation (pure
//! `DashMap`/`RwLock`, matches the donor's `storage::memory_storage`) and a
//! `HybridStore` that wraps it with an asynchronous JSON-file writer
//! (ungrounded in any one donor file, but the write-behind shape follows the
//! donor's `storage::file_storage` "in-memory catalog mirrored to disk"
//! design).

pub mod hybrid_store;
pub mod memory_store;

pub use hybrid_store::HybridStore;
pub use memory_store::MemoryStore;

use crate::document::{Document, DocumentId};
use crate::error::Result;

pub trait DocumentStore: Send + Sync {
    fn create_collection(&self, name: &str) -> Result<()>;
    fn drop_collection(&self, name: &str) -> Result<()>;
    fn insert(&self, collection: &str, doc: Document) -> Result<()>;
    fn replace(&self, collection: &str, doc: Document) -> Result<()>;
    fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>>;
    fn delete(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>>;
    fn get_all(&self, collection: &str) -> Result<Vec<Document>>;
    fn count(&self, collection: &str) -> Result<usize>;
    fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool>;
    fn clear_collection(&self, collection: &str) -> Result<()>;
    fn get_collections(&self) -> Vec<String>;
}
