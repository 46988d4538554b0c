//! Index definitions and the single/compound/sparse/unique wrapper
//! semantics layered on top of the bare `BTree` (§4.5). A secondary index
//! is always "field(s) -> set of document ids"; these wrappers decide which
//! documents get a key at all (sparse) and whether a key may map to more
//! than one document (unique).

use crate::document::Document;
use crate::error::{Result, StoreError};
use crate::index::btree::BTree;
use crate::index::key::IndexKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    pub sparse: bool,
}

impl IndexDefinition {
    pub fn is_compound(&self) -> bool {
        self.fields.len() > 1
    }

    /// Human-readable type string surfaced by `explain()`/`list_indexes`,
    /// e.g. `"Unique Compound B-Tree"`, `"Sparse B-Tree"`, `"B-Tree"`.
    pub fn type_name(&self) -> String {
        let mut parts = Vec::new();
        if self.unique {
            parts.push("Unique");
        }
        if self.sparse {
            parts.push("Sparse");
        }
        if self.is_compound() {
            parts.push("Compound");
        }
        parts.push("B-Tree");
        parts.join(" ")
    }
}

pub struct Index {
    pub def: IndexDefinition,
    tree: BTree<IndexKey, String>,
}

impl Index {
    pub fn new(def: IndexDefinition) -> Self {
        Index {
            def,
            tree: BTree::default(),
        }
    }

    /// Compute this index's key for `doc`, or `None` if the document should
    /// be excluded — only possible when `sparse` is set and at least one
    /// indexed field is entirely absent from the document.
    fn key_for(&self, doc: &Document) -> Option<IndexKey> {
        let mut missing_any = false;
        let parts: Vec<crate::value::Value> = self
            .def
            .fields
            .iter()
            .map(|f| match doc.get(f) {
                Some(v) => v.clone(),
                None => {
                    missing_any = true;
                    crate::value::Value::Null
                }
            })
            .collect();

        if self.def.sparse && missing_any {
            return None;
        }

        if self.def.is_compound() {
            Some(IndexKey::compound(parts))
        } else {
            Some(IndexKey::from(&parts[0]))
        }
    }

    /// Insert `doc` into the index, enforcing the unique constraint if set.
    pub fn insert(&mut self, doc: &Document) -> Result<()> {
        let Some(key) = self.key_for(doc) else {
            return Ok(());
        };
        let id = doc.id.as_string();
        if self.def.unique {
            if let Some(existing) = self.tree.get(&key) {
                if existing.iter().any(|d| d != &id) {
                    return Err(StoreError::DuplicateKey {
                        index: self.def.name.clone(),
                        key: format!("{key:?}"),
                    });
                }
            }
        }
        self.tree.insert(key, id);
        Ok(())
    }

    pub fn remove(&mut self, doc: &Document) {
        if let Some(key) = self.key_for(doc) {
            self.tree.remove(&key, &doc.id.as_string());
        }
    }

    /// Update the index for a document whose fields changed. On a unique
    /// violation the old mapping is restored before the error propagates.
    pub fn update(&mut self, old: &Document, new: &Document) -> Result<()> {
        let old_key = self.key_for(old);
        let new_key = self.key_for(new);
        if old_key == new_key {
            return Ok(());
        }
        if let Some(k) = &old_key {
            self.tree.remove(k, &old.id.as_string());
        }
        match self.insert(new) {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(k) = old_key {
                    self.tree.insert(k, old.id.as_string());
                }
                Err(e)
            }
        }
    }

    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<String> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    pub fn lookup_range(&self, lo: Option<&IndexKey>, hi: Option<&IndexKey>) -> Vec<String> {
        self.tree
            .range(lo, hi)
            .into_iter()
            .flat_map(|(_, ids)| ids.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
