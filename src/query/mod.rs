//! Query engine (§4.6).
//!
//! Kept the donor's Strategy-pattern refactor of `query/operators.rs`
//! (`OperatorMatcher` trait + registry, replacing one giant match
//! expression) but narrowed the operator set to the spec's
//! `$eq/$ne/$gt/$gte/$lt/$lte/$in/$nin/$and/$or/$not/$exists` (the donor
//! also carries `$regex`/`$type`/`$mod`/etc., which are out of scope here)
//! and retargeted matching from `serde_json::Value` to this crate's own
//! `Value`.

pub mod executor;
pub mod filter;
pub mod parser;

pub use executor::{ExecutionPlan, QueryExecutor, QueryResult};
pub use filter::matches_filter;
pub use parser::{ParsedQuery, SortSpec};
