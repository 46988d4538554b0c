//! Index key type and ordering (§4.5). Lifted from the donor's
//! `index.rs` `IndexKey`/`OrderedFloat` (donor used it to order a B+ Tree's
//! on-disk pages; here it orders the in-memory classical B-tree's keys).
//! Null sorts below every non-null value, matching the donor; compound keys
//! compare lexicographically component by component.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
    Compound(Vec<IndexKey>),
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Bool(_), _) => Ordering::Less,
            (_, Bool(_)) => Ordering::Greater,

            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Int(_), _) => Ordering::Less,
            (_, Int(_)) => Ordering::Greater,

            (Float(a), Float(b)) => a.cmp(b),
            (Float(_), _) => Ordering::Less,
            (_, Float(_)) => Ordering::Greater,

            (String(a), String(b)) => a.cmp(b),
            (String(_), Compound(_)) => Ordering::Less,
            (Compound(_), String(_)) => Ordering::Greater,

            (Compound(a), Compound(b)) => a.cmp(b),
        }
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Int64(i) => IndexKey::Int(*i),
            Value::Float64(f) => IndexKey::Float(OrderedFloat(*f)),
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Bytes(_) | Value::Array(_) | Value::Object(_) => IndexKey::Null,
        }
    }
}

impl IndexKey {
    pub fn compound(parts: Vec<Value>) -> Self {
        IndexKey::Compound(parts.iter().map(IndexKey::from).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, IndexKey::Null)
            || matches!(self, IndexKey::Compound(parts) if parts.iter().all(|p| p.is_null()))
    }
}
