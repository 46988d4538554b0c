//! Executes a `ParsedQuery` against a collection's documents, choosing an
//! index-accelerated path when an equality clause on an indexed field is
//! present and falling back to a full scan otherwise (§4.6). Mirrors the
//! donor's `find_with_hint`/`explain` split between "planned" and "actually
//! ran this way" that `collection_core` exposes.

use super::filter::matches_filter;
use super::parser::{ParsedQuery, SortDirection};
use crate::document::Document;
use crate::error::Result;
use crate::index::{IndexKey, IndexManager};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPlan {
    IndexScan { index_name: String },
    CollectionScan,
}

#[derive(Debug)]
pub struct QueryResult {
    pub documents: Vec<Document>,
    pub total_matched: usize,
    pub plan: ExecutionPlan,
}

pub struct QueryExecutor;

impl QueryExecutor {
    /// Pick a candidate set of documents to filter: either every document in
    /// `all_docs`, or — when the filter's top-level keys include an equality
    /// clause on a single indexed field — only the documents that index
    /// resolves, which the filter then re-checks for full correctness (the
    /// index lookup never reads from any other clause in the filter).
    fn plan_and_candidates<'a>(
        query: &ParsedQuery,
        all_docs: &'a [Document],
        indexes: &IndexManager,
    ) -> (ExecutionPlan, Vec<&'a Document>) {
        if let Value::Object(fields) = &query.filter {
            for (field, value) in fields {
                if field.starts_with('$') {
                    continue;
                }
                let eq_value = match value {
                    Value::Object(ops) if ops.len() == 1 => ops.get("$eq"),
                    literal if !matches!(literal, Value::Object(_)) => Some(literal),
                    _ => None,
                };
                if let Some(eq_value) = eq_value {
                    if let Some(index) = indexes.find_for_fields(&[field.as_str()]) {
                        let key = IndexKey::from(eq_value);
                        let ids = index.lookup_eq(&key);
                        let candidates = all_docs
                            .iter()
                            .filter(|d| ids.contains(&d.id.as_string()))
                            .collect();
                        return (
                            ExecutionPlan::IndexScan {
                                index_name: index.def.name.clone(),
                            },
                            candidates,
                        );
                    }
                }
            }
        }
        (ExecutionPlan::CollectionScan, all_docs.iter().collect())
    }

    pub fn execute(
        query: &ParsedQuery,
        all_docs: &[Document],
        indexes: &IndexManager,
    ) -> Result<QueryResult> {
        let (plan, candidates) = Self::plan_and_candidates(query, all_docs, indexes);

        let mut matched: Vec<Document> = candidates
            .into_iter()
            .filter_map(|d| match matches_filter(d, &query.filter) {
                Ok(true) => Some(Ok(d.clone())),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>>>()?;

        sort_documents(&mut matched, &query.sort);
        let total_matched = matched.len();

        let skipped: Vec<Document> = matched.into_iter().skip(query.options.skip).collect();
        let limited: Vec<Document> = match query.options.limit {
            Some(limit) => skipped.into_iter().take(limit).collect(),
            None => skipped,
        };

        Ok(QueryResult {
            documents: limited,
            total_matched,
            plan,
        })
    }

    pub fn explain(query: &ParsedQuery, all_docs: &[Document], indexes: &IndexManager) -> ExecutionPlan {
        Self::plan_and_candidates(query, all_docs, indexes).0
    }

    pub fn count(query: &ParsedQuery, all_docs: &[Document], indexes: &IndexManager) -> Result<usize> {
        let (_, candidates) = Self::plan_and_candidates(query, all_docs, indexes);
        let mut count = 0;
        for d in candidates {
            if matches_filter(d, &query.filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn exists(query: &ParsedQuery, all_docs: &[Document], indexes: &IndexManager) -> Result<bool> {
        let (_, candidates) = Self::plan_and_candidates(query, all_docs, indexes);
        for d in candidates {
            if matches_filter(d, &query.filter)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Distinct values of `field` among documents matching `filter`.
    pub fn distinct(
        query: &ParsedQuery,
        field: &str,
        all_docs: &[Document],
        indexes: &IndexManager,
    ) -> Result<Vec<Value>> {
        let (_, candidates) = Self::plan_and_candidates(query, all_docs, indexes);
        let mut values = Vec::new();
        for d in candidates {
            if matches_filter(d, &query.filter)? {
                if let Some(v) = d.get(field) {
                    if !values.contains(v) {
                        values.push(v.clone());
                    }
                }
            }
        }
        Ok(values)
    }
}

fn sort_documents(docs: &mut [Document], sort: &[super::parser::SortSpec]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for spec in sort {
            let av = a.get(&spec.field).unwrap_or(&Value::Null);
            let bv = b.get(&spec.field).unwrap_or(&Value::Null);
            let ord = av.partial_compare(bv).unwrap_or(std::cmp::Ordering::Equal);
            let ord = match spec.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}
