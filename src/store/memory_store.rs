//! Pure in-memory `DocumentStore` (§4.1): `collection -> id -> Document`,
//! one `parking_lot::RwLock` per collection so readers on different
//! collections never contend, following the donor's `storage::memory_storage`
//! shape but keyed on `DocumentId::as_string()` rather than the donor's
//! offset-based catalog.

use super::DocumentStore;
use crate::document::{Document, DocumentId};
use crate::error::{Result, StoreError};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, RwLock<BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl DocumentStore for MemoryStore {
    fn create_collection(&self, name: &str) -> Result<()> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| RwLock::new(BTreeMap::new()));
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn insert(&self, collection: &str, doc: Document) -> Result<()> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let mut guard = coll.write();
        let key = doc.id.as_string();
        if guard.contains_key(&key) {
            return Err(StoreError::DocumentAlreadyExists {
                collection: collection.to_string(),
                id: key,
            });
        }
        guard.insert(key, doc);
        Ok(())
    }

    fn replace(&self, collection: &str, doc: Document) -> Result<()> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        coll.write().insert(doc.id.as_string(), doc);
        Ok(())
    }

    fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let result = coll.read().get(&id.as_string()).cloned();
        Ok(result)
    }

    fn delete(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let result = coll.write().remove(&id.as_string());
        Ok(result)
    }

    fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let result = coll.read().values().cloned().collect();
        Ok(result)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let result = coll.read().len();
        Ok(result)
    }

    fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let result = coll.read().contains_key(&id.as_string());
        Ok(result)
    }

    fn clear_collection(&self, collection: &str) -> Result<()> {
        let coll = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        coll.write().clear();
        Ok(())
    }

    fn get_collections(&self) -> Vec<String> {
        self.collections.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap as Map;

    fn doc(id: &str) -> Document {
        Document::new_inserted(DocumentId::from(id), Map::new(), Utc::now())
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let store = MemoryStore::new();
        store.create_collection("users").unwrap();
        store.insert("users", doc("1")).unwrap();
        assert!(store.get("users", &DocumentId::from("1")).unwrap().is_some());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let store = MemoryStore::new();
        store.create_collection("users").unwrap();
        store.insert("users", doc("1")).unwrap();
        assert!(store.insert("users", doc("1")).is_err());
    }

    #[test]
    fn operations_on_missing_collection_error() {
        let store = MemoryStore::new();
        assert!(store.insert("ghost", doc("1")).is_err());
        assert!(store.get("ghost", &DocumentId::from("1")).is_err());
    }

    #[test]
    fn clear_collection_empties_without_dropping() {
        let store = MemoryStore::new();
        store.create_collection("users").unwrap();
        store.insert("users", doc("1")).unwrap();
        store.clear_collection("users").unwrap();
        assert_eq!(store.count("users").unwrap(), 0);
    }
}
