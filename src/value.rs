//! The document value sum type.
//!
//! The donor codebase matches MongoDB's own looseness and stores document
//! fields directly as `serde_json::Value`. Per the design note on runtime
//! type coercion, this crate keeps an explicit sum type instead so that the
//! atomic-update engine and filter engine pattern-match on a closed set of
//! variants and surface a typed error on mismatch, rather than discovering
//! a type error deep inside a generic JSON tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(ByteBuf),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// Extended-JSON-style binary wrapper so `Bytes` round-trips through JSON as
/// `{"$binary": "<base64>"}` instead of being indistinguishable from a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteBuf {
    #[serde(rename = "$binary")]
    pub base64: String,
}

impl ByteBuf {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        use base64::Engine;
        ByteBuf {
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .ok()
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(i) => Some(*i as f64),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int64(_) | Value::Float64(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get a field by dotted path, descending through objects and array indices.
    /// An absent intermediate object yields `None` (spec: compares as null).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        let mut current = self;
        for part in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a dotted path, creating intermediate objects as needed.
    /// Traversing through a non-object intermediate replaces it with an object.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let parts: Vec<&str> = path.split('.').collect();
        Self::set_path_parts(self, &parts, value);
    }

    fn set_path_parts(current: &mut Value, parts: &[&str], value: Value) {
        if parts.is_empty() {
            return;
        }
        if parts.len() == 1 {
            match current {
                Value::Object(map) => {
                    map.insert(parts[0].to_string(), value);
                }
                _ => {
                    let mut map = BTreeMap::new();
                    map.insert(parts[0].to_string(), value);
                    *current = Value::Object(map);
                }
            }
            return;
        }
        if !matches!(current, Value::Object(_)) {
            *current = Value::Object(BTreeMap::new());
        }
        if let Value::Object(map) = current {
            let next = map
                .entry(parts[0].to_string())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            Self::set_path_parts(next, &parts[1..], value);
        }
    }

    /// Remove a value at a dotted path. Missing path is a no-op returning `None`.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').collect();
        Self::remove_path_parts(self, &parts)
    }

    fn remove_path_parts(current: &mut Value, parts: &[&str]) -> Option<Value> {
        if parts.is_empty() {
            return None;
        }
        if parts.len() == 1 {
            return match current {
                Value::Object(map) => map.remove(parts[0]),
                _ => None,
            };
        }
        match current {
            Value::Object(map) => {
                let next = map.get_mut(parts[0])?;
                Self::remove_path_parts(next, &parts[1..])
            }
            _ => None,
        }
    }

    /// Numeric comparison promoting ints to f64 when operand types differ.
    pub fn compare_numeric(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap())
            }
            _ => None,
        }
    }

    /// General ordering across comparable value kinds; `None` for incomparable pairs.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => a.compare_numeric(b),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => {
                // Extended-JSON binary marker lands here as a regular object,
                // not a string; plain strings stay plain strings.
                Value::String(s.clone())
            }
            serde_json::Value::Array(a) => Value::Array(a.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(b64)) = map.get("$binary") {
                        return Value::Bytes(ByteBuf {
                            base64: b64.clone(),
                        });
                    }
                }
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), Value::from(v));
                }
                Value::Object(out)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from(&v)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int64(i) => serde_json::Value::Number(Number::from(*i)),
            Value::Float64(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                let mut map = Map::new();
                map.insert(
                    "$binary".to_string(),
                    serde_json::Value::String(b.base64.clone()),
                );
                serde_json::Value::Object(map)
            }
            Value::Array(a) => serde_json::Value::Array(a.iter().map(Into::into).collect()),
            Value::Object(o) => {
                let mut map = Map::new();
                for (k, v) in o {
                    map.insert(k.clone(), v.into());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        (&v).into()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json: serde_json::Value = self.into();
        write!(f, "{}", json)
    }
}
