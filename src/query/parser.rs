//! Parses the wire-level query document shape `{collection, filter?, sort?,
//! options?}` (§4.6, §2.2) into a typed `ParsedQuery`. The donor's `Query`
//! struct (see `query.rs`) was "deprecated" in favor of raw JSON passed
//! straight to `matches_filter`; this parser keeps that JSON-first
//! philosophy but adds the envelope fields (`sort`/`skip`/`limit`/`distinct`)
//! the spec's query operation needs that the donor's bare filter didn't
//! carry.

use crate::error::{Result, StoreError};
use crate::value::Value;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
    #[serde(default)]
    pub distinct_field: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub collection: String,
    pub filter: Value,
    pub sort: Vec<SortSpec>,
    pub options: QueryOptions,
}

/// Wire-level shape before field-by-field conversion.
#[derive(Deserialize)]
struct RawQuery {
    collection: String,
    #[serde(default)]
    filter: Option<serde_json::Value>,
    #[serde(default)]
    sort: Option<serde_json::Value>,
    #[serde(default)]
    options: QueryOptions,
}

pub fn parse_query(json: &serde_json::Value) -> Result<ParsedQuery> {
    let raw: RawQuery = serde_json::from_value(json.clone())
        .map_err(|e| StoreError::ParseError(e.to_string()))?;

    if raw.collection.trim().is_empty() {
        return Err(StoreError::InvalidName("collection name is empty".into()));
    }

    let filter = match raw.filter {
        Some(f) => Value::from(&f),
        None => Value::Object(Default::default()),
    };

    let sort = match raw.sort {
        Some(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(field, dir)| {
                let direction = match dir.as_i64() {
                    Some(d) if d < 0 => SortDirection::Descending,
                    _ => SortDirection::Ascending,
                };
                SortSpec { field, direction }
            })
            .collect(),
        Some(_) => {
            return Err(StoreError::ArgumentInvalid(
                "sort must be an object of field -> 1|-1".into(),
            ))
        }
        None => Vec::new(),
    };

    Ok(ParsedQuery {
        collection: raw.collection,
        filter,
        sort,
        options: raw.options,
    })
}
