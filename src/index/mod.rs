//! Index subsystem (§4.5): classical in-memory B-trees, rebuilt from the
//! document store on open rather than persisted as pages the way the
//! donor's B+ Tree was.

pub mod btree;
pub mod key;
pub mod wrappers;

pub use btree::BTree;
pub use key::{IndexKey, OrderedFloat};
pub use wrappers::{Index, IndexDefinition};

use crate::document::Document;
use crate::error::{Result, StoreError};
use std::collections::HashMap;

/// Per-collection set of secondary indexes, keyed by index name.
#[derive(Default)]
pub struct IndexManager {
    indexes: HashMap<String, Index>,
}

impl IndexManager {
    pub fn create(&mut self, def: IndexDefinition, docs: impl Iterator<Item = Document>) -> Result<()> {
        if self.indexes.contains_key(&def.name) {
            return Err(StoreError::IndexAlreadyExists(def.name));
        }
        let mut index = Index::new(def.clone());
        for doc in docs {
            index.insert(&doc)?;
        }
        self.indexes.insert(def.name, index);
        Ok(())
    }

    pub fn drop(&mut self, name: &str) -> Result<()> {
        self.indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn list(&self) -> Vec<&IndexDefinition> {
        self.indexes.values().map(|i| &i.def).collect()
    }

    /// An index usable for an equality/range lookup on exactly this field
    /// list, preferring the first match (definition order is insertion
    /// order from `create_index` calls).
    pub fn find_for_fields(&self, fields: &[&str]) -> Option<&Index> {
        self.indexes
            .values()
            .find(|idx| idx.def.fields.iter().map(String::as_str).eq(fields.iter().copied()))
    }

    pub fn on_insert(&mut self, doc: &Document) -> Result<()> {
        for index in self.indexes.values_mut() {
            index.insert(doc)?;
        }
        Ok(())
    }

    pub fn on_remove(&mut self, doc: &Document) {
        for index in self.indexes.values_mut() {
            index.remove(doc);
        }
    }

    pub fn on_update(&mut self, old: &Document, new: &Document) -> Result<()> {
        for index in self.indexes.values_mut() {
            index.update(old, new)?;
        }
        Ok(())
    }
}
