//! Keeps the set of active transactions and drives begin/commit/rollback.
//!
//! The coordinator itself does not know how to apply operations to storage
//! or append WAL records — `Database` supplies those as closures at commit
//! time, matching the donor's `DatabaseCore` split between "what a
//! transaction recorded" and "how the store chooses to persist it".

use super::{IsolationLevel, Operation, Transaction, TransactionId, TransactionState};
use crate::error::{Result, StoreError};
use crate::events::{NullSink, TransactionEventSink};
use dashmap::DashMap;
use std::sync::Arc;

pub struct TransactionCoordinator {
    active: DashMap<TransactionId, Transaction>,
    sink: Arc<dyn TransactionEventSink>,
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        TransactionCoordinator::new(Arc::new(NullSink))
    }
}

impl TransactionCoordinator {
    pub fn new(sink: Arc<dyn TransactionEventSink>) -> Self {
        TransactionCoordinator {
            active: DashMap::new(),
            sink,
        }
    }

    pub fn begin(&self, isolation: IsolationLevel) -> TransactionId {
        let txn = Transaction::new(isolation, self.sink.clone());
        let id = txn.id;
        self.active.insert(id, txn);
        id
    }

    pub fn isolation_of(&self, id: TransactionId) -> Result<IsolationLevel> {
        self.active
            .get(&id)
            .map(|t| t.isolation)
            .ok_or(StoreError::TransactionNotFound(id))
    }

    pub fn state_of(&self, id: TransactionId) -> Result<TransactionState> {
        self.active
            .get(&id)
            .map(|t| t.state())
            .ok_or(StoreError::TransactionNotFound(id))
    }

    pub fn record_read(&self, id: TransactionId, collection: &str, doc_id: &str) -> Result<()> {
        let mut t = self
            .active
            .get_mut(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        t.record_read(collection, doc_id);
        Ok(())
    }

    pub fn record_write(&self, id: TransactionId, op: Operation) -> Result<()> {
        let mut t = self
            .active
            .get_mut(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        t.record_write(op);
        Ok(())
    }

    pub fn savepoint(&self, id: TransactionId, name: impl Into<String>) -> Result<()> {
        let mut t = self
            .active
            .get_mut(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        t.savepoint(name);
        Ok(())
    }

    pub fn rollback_to(&self, id: TransactionId, name: &str) -> Result<Vec<Operation>> {
        let mut t = self
            .active
            .get_mut(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        t.rollback_to(name)
    }

    /// Commit a transaction. `apply` is invoked with the transaction's full
    /// operation log and is responsible for writing the commit WAL record
    /// and applying the changes to the store; if it fails the transaction is
    /// aborted rather than committed.
    pub fn commit<F>(&self, id: TransactionId, apply: F) -> Result<()>
    where
        F: FnOnce(&[Operation]) -> Result<()>,
    {
        let (_, mut txn) = self
            .active
            .remove(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        if txn.state() != TransactionState::Active {
            return Err(StoreError::TransactionError(txn.state()));
        }
        match apply(txn.operations()) {
            Ok(()) => {
                txn.mark_committed();
                Ok(())
            }
            Err(e) => {
                txn.mark_aborted(e.to_string());
                Err(e)
            }
        }
    }

    /// Roll back a transaction, returning its recorded operations in
    /// reverse order so the caller can unwind in-memory effects.
    pub fn rollback(&self, id: TransactionId) -> Result<Vec<Operation>> {
        let (_, mut txn) = self
            .active
            .remove(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        let mut ops = txn.operations().to_vec();
        ops.reverse();
        txn.mark_rolled_back();
        Ok(ops)
    }

    pub fn abort(&self, id: TransactionId, reason: impl Into<String>) -> Result<Vec<Operation>> {
        let (_, mut txn) = self
            .active
            .remove(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        let mut ops = txn.operations().to_vec();
        ops.reverse();
        txn.mark_aborted(reason);
        Ok(ops)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// RAII guard returned by `Database::begin_transaction` in the style of the
/// donor's connection guards: dropping it without an explicit `commit()`
/// rolls the transaction back so a `?`-propagated error never leaves a
/// transaction dangling open.
pub struct TransactionGuard<'a> {
    coordinator: &'a TransactionCoordinator,
    id: TransactionId,
    finished: bool,
}

impl<'a> TransactionGuard<'a> {
    pub fn new(coordinator: &'a TransactionCoordinator, id: TransactionId) -> Self {
        TransactionGuard {
            coordinator,
            id,
            finished: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.coordinator.rollback(self.id);
        }
    }
}
