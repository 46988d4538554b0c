//! Operator registry and filter matching (§4.6). Strategy pattern carried
//! over from the donor's `query/operators.rs`: each operator is a small type
//! implementing `OperatorMatcher`, looked up by name from a registry instead
//! of one large match expression.

use crate::document::Document;
use crate::error::{Result, StoreError};
use crate::value::Value;
use std::collections::HashMap;

pub trait OperatorMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    /// `doc_value` is `None` when the field is missing from the document.
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool>;
}

macro_rules! cmp_operator {
    ($struct_name:ident, $name:literal, $ord:pat) => {
        struct $struct_name;
        impl OperatorMatcher for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }
            fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
                let dv = doc_value.unwrap_or(&Value::Null);
                Ok(matches!(dv.partial_compare(filter_value), Some($ord)))
            }
        }
    };
}

cmp_operator!(GtOperator, "$gt", std::cmp::Ordering::Greater);
cmp_operator!(LtOperator, "$lt", std::cmp::Ordering::Less);

struct EqOperator;
impl OperatorMatcher for EqOperator {
    fn name(&self) -> &'static str {
        "$eq"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        Ok(dv == filter_value)
    }
}

struct NeOperator;
impl OperatorMatcher for NeOperator {
    fn name(&self) -> &'static str {
        "$ne"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        Ok(dv != filter_value)
    }
}

struct GteOperator;
impl OperatorMatcher for GteOperator {
    fn name(&self) -> &'static str {
        "$gte"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        Ok(matches!(
            dv.partial_compare(filter_value),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ))
    }
}

struct LteOperator;
impl OperatorMatcher for LteOperator {
    fn name(&self) -> &'static str {
        "$lte"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        Ok(matches!(
            dv.partial_compare(filter_value),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ))
    }
}

struct InOperator;
impl OperatorMatcher for InOperator {
    fn name(&self) -> &'static str {
        "$in"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        let list = filter_value.as_array().ok_or_else(|| {
            StoreError::ArgumentInvalid("$in requires an array".to_string())
        })?;
        Ok(list.iter().any(|v| v == dv))
    }
}

struct NinOperator;
impl OperatorMatcher for NinOperator {
    fn name(&self) -> &'static str {
        "$nin"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let dv = doc_value.unwrap_or(&Value::Null);
        let list = filter_value.as_array().ok_or_else(|| {
            StoreError::ArgumentInvalid("$nin requires an array".to_string())
        })?;
        Ok(!list.iter().any(|v| v == dv))
    }
}

struct ExistsOperator;
impl OperatorMatcher for ExistsOperator {
    fn name(&self) -> &'static str {
        "$exists"
    }
    fn matches(&self, doc_value: Option<&Value>, filter_value: &Value) -> Result<bool> {
        let want = matches!(filter_value, Value::Bool(true));
        Ok(doc_value.is_some() == want)
    }
}

fn registry() -> HashMap<&'static str, Box<dyn OperatorMatcher>> {
    let ops: Vec<Box<dyn OperatorMatcher>> = vec![
        Box::new(EqOperator),
        Box::new(NeOperator),
        Box::new(GtOperator),
        Box::new(GteOperator),
        Box::new(LtOperator),
        Box::new(LteOperator),
        Box::new(InOperator),
        Box::new(NinOperator),
        Box::new(ExistsOperator),
    ];
    ops.into_iter().map(|op| (op.name(), op)).collect()
}

/// Evaluate a single field's operator-object filter, e.g.
/// `{"$gt": 18, "$lt": 65}` — every key must match (implicit AND).
fn matches_operators(doc_value: Option<&Value>, ops: &std::collections::BTreeMap<String, Value>) -> Result<bool> {
    let reg = registry();
    for (op_name, op_filter) in ops {
        let matcher = reg
            .get(op_name.as_str())
            .ok_or_else(|| StoreError::ArgumentInvalid(format!("unknown operator: {op_name}")))?;
        if !matcher.matches(doc_value, op_filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a full filter document against `doc`. Top-level `$and`/`$or`/
/// `$not` are logical combinators; any other top-level key is a field path
/// whose value is either a literal (implicit `$eq`) or an operator object.
pub fn matches_filter(doc: &Document, filter: &Value) -> Result<bool> {
    let Value::Object(fields) = filter else {
        return Err(StoreError::ArgumentInvalid(
            "filter must be a JSON object".to_string(),
        ));
    };
    for (key, value) in fields {
        let ok = match key.as_str() {
            "$and" => {
                let clauses = value.as_array().ok_or_else(|| {
                    StoreError::ArgumentInvalid("$and requires an array".to_string())
                })?;
                clauses
                    .iter()
                    .map(|c| matches_filter(doc, c))
                    .collect::<Result<Vec<_>>>()?
                    .into_iter()
                    .all(|b| b)
            }
            "$or" => {
                let clauses = value.as_array().ok_or_else(|| {
                    StoreError::ArgumentInvalid("$or requires an array".to_string())
                })?;
                let mut any = false;
                for c in clauses {
                    if matches_filter(doc, c)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$not" => !matches_filter(doc, value)?,
            field => {
                let doc_value = doc.get(field);
                match value {
                    Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                        matches_operators(doc_value, ops)?
                    }
                    literal => doc_value.unwrap_or(&Value::Null) == literal,
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn doc(age: i64, name: &str) -> Document {
        let mut data = BTreeMap::new();
        data.insert("age".to_string(), Value::Int64(age));
        data.insert("name".to_string(), Value::String(name.to_string()));
        Document::new_inserted(DocumentId::from("1"), data, Utc::now())
    }

    #[test]
    fn implicit_eq_on_literal() {
        let d = doc(30, "Alice");
        let filter = Value::Object(BTreeMap::from([(
            "name".to_string(),
            Value::String("Alice".into()),
        )]));
        assert!(matches_filter(&d, &filter).unwrap());
    }

    #[test]
    fn gt_and_lt_combine_on_same_field() {
        let d = doc(30, "Alice");
        let mut ops = BTreeMap::new();
        ops.insert("$gt".to_string(), Value::Int64(18));
        ops.insert("$lt".to_string(), Value::Int64(65));
        let filter = Value::Object(BTreeMap::from([("age".to_string(), Value::Object(ops))]));
        assert!(matches_filter(&d, &filter).unwrap());
    }

    #[test]
    fn missing_field_fails_exists_true() {
        let d = doc(30, "Alice");
        let mut ops = BTreeMap::new();
        ops.insert("$exists".to_string(), Value::Bool(true));
        let filter = Value::Object(BTreeMap::from([(
            "missing".to_string(),
            Value::Object(ops),
        )]));
        assert!(!matches_filter(&d, &filter).unwrap());
    }

    #[test]
    fn or_matches_if_any_clause_matches() {
        let d = doc(30, "Alice");
        let clause_a = Value::Object(BTreeMap::from([(
            "name".to_string(),
            Value::String("Bob".into()),
        )]));
        let clause_b = Value::Object(BTreeMap::from([(
            "name".to_string(),
            Value::String("Alice".into()),
        )]));
        let filter = Value::Object(BTreeMap::from([(
            "$or".to_string(),
            Value::Array(vec![clause_a, clause_b]),
        )]));
        assert!(matches_filter(&d, &filter).unwrap());
    }

    #[test]
    fn not_negates_inner_filter() {
        let d = doc(30, "Alice");
        let inner = Value::Object(BTreeMap::from([(
            "name".to_string(),
            Value::String("Alice".into()),
        )]));
        let filter = Value::Object(BTreeMap::from([("$not".to_string(), inner)]));
        assert!(!matches_filter(&d, &filter).unwrap());
    }
}
