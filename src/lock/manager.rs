//! Resource lock table: acquire/release with FIFO waiters, reentrancy, and
//! upgrade, built on `parking_lot::Mutex` + `Condvar` the way the rest of
//! this codebase already guards shared state.

use super::{ResourceId, Waiter};
use crate::error::{Result, StoreError};
use crate::events::{LockEvent, LockEventSink, NullSink};
use crate::transaction::TransactionId;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Default)]
struct ResourceState {
    holders: HashMap<TransactionId, LockMode>,
    queue: VecDeque<Waiter>,
}

impl ResourceState {
    fn compatible(&self, txn: TransactionId, mode: LockMode) -> bool {
        if self.holders.is_empty() {
            return true;
        }
        if self.holders.len() == 1 && self.holders.contains_key(&txn) {
            return true; // reentrant path handles actual mode change
        }
        match mode {
            LockMode::Shared => self.holders.values().all(|m| *m == LockMode::Shared),
            LockMode::Exclusive => false,
        }
    }
}

#[derive(Default)]
struct Table {
    resources: HashMap<ResourceId, ResourceState>,
    aborted: HashSet<TransactionId>,
}

pub struct LockManager {
    table: Mutex<Table>,
    condvar: Condvar,
    sink: Arc<dyn LockEventSink>,
}

impl Default for LockManager {
    fn default() -> Self {
        LockManager::new(Arc::new(NullSink))
    }
}

impl LockManager {
    pub fn new(sink: Arc<dyn LockEventSink>) -> Self {
        LockManager {
            table: Mutex::new(Table::default()),
            condvar: Condvar::new(),
            sink,
        }
    }

    /// Acquire `mode` on `resource` for `txn`, blocking up to `timeout`
    /// (`None` waits indefinitely). A zero-duration timeout that cannot be
    /// satisfied immediately fails instantly rather than parking at all.
    pub fn acquire(
        &self,
        txn: TransactionId,
        resource: &str,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut table = self.table.lock();

        loop {
            if table.aborted.remove(&txn) {
                return Err(StoreError::LockDeadlock);
            }

            let state = table.resources.entry(resource.to_string()).or_default();
            if let Some(&held) = state.holders.get(&txn) {
                if held >= mode {
                    return Ok(());
                }
                // Shared -> Exclusive upgrade.
                if state.holders.len() == 1 {
                    state.holders.insert(txn, LockMode::Exclusive);
                    self.sink.on_event(LockEvent::Acquired {
                        txn,
                        resource: resource.to_string(),
                    });
                    return Ok(());
                }
            } else if state.compatible(txn, mode) && !state.queue.iter().any(|w| w.txn != txn) {
                state.holders.insert(txn, mode);
                self.sink.on_event(LockEvent::Acquired {
                    txn,
                    resource: resource.to_string(),
                });
                return Ok(());
            }

            if !state.queue.iter().any(|w| w.txn == txn) {
                state.queue.push_back(Waiter { txn, mode });
            }

            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    self.remove_waiter(&mut table, resource, txn);
                    return Err(StoreError::LockTimeout(resource.to_string()));
                }
                let timed_out = self.condvar.wait_for(&mut table, deadline - now).timed_out();
                if timed_out && Instant::now() >= deadline {
                    if table.aborted.remove(&txn) {
                        return Err(StoreError::LockDeadlock);
                    }
                    self.remove_waiter(&mut table, resource, txn);
                    return Err(StoreError::LockTimeout(resource.to_string()));
                }
            } else {
                self.condvar.wait(&mut table);
            }
        }
    }

    pub fn release(&self, txn: TransactionId, resource: &str) {
        let mut table = self.table.lock();
        if let Some(state) = table.resources.get_mut(resource) {
            state.holders.remove(&txn);
            state.queue.retain(|w| w.txn != txn);
        }
        self.sink.on_event(LockEvent::Released {
            txn,
            resource: resource.to_string(),
        });
        self.condvar.notify_all();
    }

    pub fn release_all(&self, txn: TransactionId) {
        let mut table = self.table.lock();
        let mut released = Vec::new();
        for (resource, state) in table.resources.iter_mut() {
            if state.holders.remove(&txn).is_some() {
                released.push(resource.clone());
            }
            state.queue.retain(|w| w.txn != txn);
        }
        for resource in released {
            self.sink.on_event(LockEvent::Released { txn, resource });
        }
        self.condvar.notify_all();
    }

    fn remove_waiter(&self, table: &mut Table, resource: &str, txn: TransactionId) {
        if let Some(state) = table.resources.get_mut(resource) {
            state.queue.retain(|w| w.txn != txn);
        }
    }

    /// Build the current waits-for graph: an edge `a -> b` means `a` is
    /// blocked waiting on a resource currently held by `b`.
    pub(crate) fn waits_for_graph(&self) -> HashMap<TransactionId, HashSet<TransactionId>> {
        let table = self.table.lock();
        let mut graph: HashMap<TransactionId, HashSet<TransactionId>> = HashMap::new();
        for state in table.resources.values() {
            for waiter in &state.queue {
                let entry = graph.entry(waiter.txn).or_default();
                for &holder in state.holders.keys() {
                    if holder != waiter.txn {
                        entry.insert(holder);
                    }
                }
            }
        }
        graph
    }

    /// Mark `txn` as the deadlock victim: its next wakeup fails with
    /// `LockDeadlock` instead of retrying.
    pub(crate) fn abort_for_deadlock(&self, txn: TransactionId) {
        let mut table = self.table.lock();
        table.aborted.insert(txn);
        for state in table.resources.values_mut() {
            state.queue.retain(|w| w.txn != txn);
        }
        drop(table);
        self.sink.on_event(LockEvent::DeadlockDetected {
            victim: txn,
            cycle: vec![txn],
        });
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_locks_are_compatible() {
        let mgr = LockManager::default();
        mgr.acquire(1, "doc1", LockMode::Shared, None).unwrap();
        mgr.acquire(2, "doc1", LockMode::Shared, None).unwrap();
    }

    #[test]
    fn exclusive_excludes_others() {
        let mgr = LockManager::default();
        mgr.acquire(1, "doc1", LockMode::Exclusive, None).unwrap();
        let err = mgr
            .acquire(2, "doc1", LockMode::Exclusive, Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout(_)));
    }

    #[test]
    fn reentrant_acquire_succeeds() {
        let mgr = LockManager::default();
        mgr.acquire(1, "doc1", LockMode::Shared, None).unwrap();
        mgr.acquire(1, "doc1", LockMode::Shared, None).unwrap();
    }

    #[test]
    fn upgrade_from_sole_shared_holder_succeeds() {
        let mgr = LockManager::default();
        mgr.acquire(1, "doc1", LockMode::Shared, None).unwrap();
        mgr.acquire(1, "doc1", LockMode::Exclusive, None).unwrap();
    }

    #[test]
    fn zero_timeout_fails_fast_when_unavailable() {
        let mgr = LockManager::default();
        mgr.acquire(1, "doc1", LockMode::Exclusive, None).unwrap();
        let err = mgr
            .acquire(2, "doc1", LockMode::Exclusive, Some(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout(_)));
    }

    #[test]
    fn release_wakes_waiter() {
        let mgr = Arc::new(LockManager::default());
        mgr.acquire(1, "doc1", LockMode::Exclusive, None).unwrap();
        let mgr2 = mgr.clone();
        let handle = std::thread::spawn(move || {
            mgr2.acquire(2, "doc1", LockMode::Exclusive, Some(Duration::from_secs(5)))
        });
        std::thread::sleep(Duration::from_millis(20));
        mgr.release(1, "doc1");
        assert!(handle.join().unwrap().is_ok());
    }
}
