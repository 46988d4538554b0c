//! Lock manager (§4.3): per-resource shared/exclusive locks with FIFO
//! waiters, reentrancy, upgrade, and background deadlock detection over a
//! waits-for graph.
//!
//! The donor has no lock manager of its own (it serializes access with a
//! single `parking_lot::RwLock` per collection); this module is built fresh
//! from the spec using the same `parking_lot` primitives the donor already
//! depends on for its collection-level locking, generalized to per-resource
//! granularity with explicit waiter queues.

mod deadlock;
mod manager;

pub use deadlock::DeadlockDetector;
pub use manager::{LockManager, LockMode};

use crate::transaction::TransactionId;

pub type ResourceId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Waiter {
    pub txn: TransactionId,
    pub mode: LockMode,
}
