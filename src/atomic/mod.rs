//! Atomic field update engine (§4.7): increment/push/pull/set/unset/
//! multiple, operating on dotted paths. The donor's `collection_core`
//! `apply_update_operators` helper folds these into its CRUD path as plain
//! JSON mutation; this module pulls that logic out into a standalone engine
//! operating on this crate's `Value` tree so the transaction coordinator and
//! lock manager can wrap a single call with a per-document exclusive latch
//! rather than updates being buried inside collection CRUD.

use crate::error::{Result, StoreError};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum AtomicOp {
    Increment { path: String, by: f64 },
    Push { path: String, value: Value },
    PushMany { path: String, values: Vec<Value> },
    Pull { path: String, value: Value },
    PullMany { path: String, values: Vec<Value> },
    Set { path: String, value: Value },
    Unset { path: String },
}

/// Apply a single atomic operation to `root` in place.
pub fn apply(root: &mut Value, op: &AtomicOp) -> Result<()> {
    match op {
        AtomicOp::Increment { path, by } => increment(root, path, *by),
        AtomicOp::Push { path, value } => push(root, path, std::slice::from_ref(value)),
        AtomicOp::PushMany { path, values } => push(root, path, values),
        AtomicOp::Pull { path, value } => pull(root, path, |v| v == value),
        AtomicOp::PullMany { path, values } => pull(root, path, |v| values.contains(v)),
        AtomicOp::Set { path, value } => {
            root.set_path(path, value.clone());
            Ok(())
        }
        AtomicOp::Unset { path } => {
            root.remove_path(path);
            Ok(())
        }
    }
}

/// Apply a batch of operations atomically against a clone of `root`: if any
/// operation fails, none of them take effect.
pub fn apply_multiple(root: &Value, ops: &[AtomicOp]) -> Result<Value> {
    let mut working = root.clone();
    for op in ops {
        apply(&mut working, op)?;
    }
    Ok(working)
}

fn increment(root: &mut Value, path: &str, by: f64) -> Result<()> {
    let current = root.get_path(path);
    let new_value = match current {
        None => by,
        Some(Value::Int64(i)) if by.fract() == 0.0 => {
            root.set_path(path, Value::Int64(*i + by as i64));
            return Ok(());
        }
        Some(v) if v.is_numeric() => v.as_f64().unwrap() + by,
        Some(_) => {
            return Err(StoreError::AtomicUpdateError {
                op: "increment",
                path: path.to_string(),
                reason: "field is not numeric".to_string(),
            })
        }
    };
    root.set_path(path, Value::Float64(new_value));
    Ok(())
}

fn push(root: &mut Value, path: &str, values: &[Value]) -> Result<()> {
    match root.get_path(path) {
        None => {
            root.set_path(path, Value::Array(values.to_vec()));
            Ok(())
        }
        Some(Value::Array(_)) => {
            let arr = resolve_array_mut(root, path)?;
            arr.extend(values.iter().cloned());
            Ok(())
        }
        Some(_) => Err(StoreError::AtomicUpdateError {
            op: "push",
            path: path.to_string(),
            reason: "field is not an array".to_string(),
        }),
    }
}

fn pull(root: &mut Value, path: &str, predicate: impl Fn(&Value) -> bool) -> Result<()> {
    match root.get_path(path) {
        None => Ok(()),
        Some(Value::Array(_)) => {
            let arr = resolve_array_mut(root, path)?;
            arr.retain(|v| !predicate(v));
            Ok(())
        }
        Some(_) => Err(StoreError::AtomicUpdateError {
            op: "pull",
            path: path.to_string(),
            reason: "field is not an array".to_string(),
        }),
    }
}

/// Re-resolve `path` as a mutable array reference. Only object-keyed path
/// segments are walked — an array index in the middle of the path is
/// rejected, matching the spec's "object-only descent" rule for these ops.
fn resolve_array_mut<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = root;
    for part in &parts[..parts.len() - 1] {
        current = match current {
            Value::Object(map) => map
                .get_mut(*part)
                .ok_or_else(|| StoreError::AtomicUpdateError {
                    op: "push/pull",
                    path: path.to_string(),
                    reason: format!("missing intermediate object at '{part}'"),
                })?,
            _ => {
                return Err(StoreError::AtomicUpdateError {
                    op: "push/pull",
                    path: path.to_string(),
                    reason: format!("'{part}' is not an object"),
                })
            }
        };
    }
    let last = parts[parts.len() - 1];
    match current {
        Value::Object(map) => map
            .get_mut(last)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| StoreError::AtomicUpdateError {
                op: "push/pull",
                path: path.to_string(),
                reason: "field is not an array".to_string(),
            }),
        _ => Err(StoreError::AtomicUpdateError {
            op: "push/pull",
            path: path.to_string(),
            reason: "not an object".to_string(),
        }),
    }
}
