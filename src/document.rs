//! The canonical document representation (§3).

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document identity within a collection. Always externally a non-empty
/// string; the donor's `DocumentId::Int | String | ObjectId` union is kept
/// internally (§2.2) so callers can ask for an auto-increment id or a
/// caller-supplied one without the store having to parse strings back into
/// numbers to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    String(String),
}

impl DocumentId {
    pub fn new_object_id() -> Self {
        DocumentId::String(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_string(&self) -> String {
        match self {
            DocumentId::Int(i) => i.to_string(),
            DocumentId::String(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DocumentId::String(s) if s.is_empty())
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId::String(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        DocumentId::String(s)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub data: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Document {
    /// Construct the document as it will look right after `insert` (§4.1):
    /// version 1, `createdAt == updatedAt`.
    pub fn new_inserted(id: DocumentId, data: BTreeMap<String, Value>, now: DateTime<Utc>) -> Self {
        Document {
            id,
            data,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Apply an update's incoming field map, preserving `created_at` and
    /// bumping `version`/`updated_at` (§4.1 `update` contract). A `None`
    /// `data` retains the previous fields.
    pub fn apply_update(&mut self, data: Option<BTreeMap<String, Value>>, now: DateTime<Utc>) {
        if let Some(data) = data {
            self.data = data;
        }
        self.version += 1;
        self.updated_at = now;
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        if !path.contains('.') {
            return self.data.get(path);
        }
        let mut parts = path.split('.');
        let mut current = self.data.get(parts.next().unwrap())?;
        for part in parts {
            current = current.get_path(part)?;
        }
        Some(current)
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert("_id".to_string(), Value::String(self.id.as_string()));
        map.insert(
            "_createdAt".to_string(),
            Value::String(self.created_at.to_rfc3339()),
        );
        map.insert(
            "_updatedAt".to_string(),
            Value::String(self.updated_at.to_rfc3339()),
        );
        map.insert("_version".to_string(), Value::Int64(self.version as i64));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn insert_sets_version_one_and_equal_timestamps() {
        let doc = Document::new_inserted(DocumentId::Int(1), BTreeMap::new(), now());
        assert_eq!(doc.version, 1);
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn update_preserves_created_at_and_bumps_version() {
        let t0 = now();
        let mut doc = Document::new_inserted(DocumentId::Int(1), BTreeMap::new(), t0);
        let t1 = t0 + Duration::seconds(1);
        doc.apply_update(None, t1);
        assert_eq!(doc.created_at, t0);
        assert_eq!(doc.updated_at, t1);
        assert_eq!(doc.version, 2);
        assert!(doc.updated_at >= doc.created_at);
    }

    #[test]
    fn null_data_retains_previous_fields() {
        let mut data = BTreeMap::new();
        data.insert("x".to_string(), Value::Int64(1));
        let mut doc = Document::new_inserted(DocumentId::Int(1), data, now());
        doc.apply_update(None, now());
        assert_eq!(doc.data.get("x"), Some(&Value::Int64(1)));
    }

    #[test]
    fn dotted_get() {
        let mut inner = BTreeMap::new();
        inner.insert("city".to_string(), Value::String("NYC".into()));
        let mut data = BTreeMap::new();
        data.insert("address".to_string(), Value::Object(inner));
        let doc = Document::new_inserted(DocumentId::Int(1), data, now());
        assert_eq!(doc.get("address.city"), Some(&Value::String("NYC".into())));
        assert_eq!(doc.get("address.missing"), None);
    }
}
