//! Event sink traits (§9 design note: model multicast events as sink
//! traits/interfaces rather than a global event bus). The lock manager,
//! transaction coordinator, and cache each accept a sink at construction.

use crate::transaction::TransactionId;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone)]
pub enum LockEvent {
    Acquired { txn: TransactionId, resource: String },
    Released { txn: TransactionId, resource: String },
    DeadlockDetected { victim: TransactionId, cycle: Vec<TransactionId> },
}

#[derive(Debug, Clone)]
pub enum TransactionEvent {
    Committed(TransactionId),
    RolledBack(TransactionId),
    Aborted(TransactionId, String),
}

#[derive(Debug, Clone)]
pub enum CacheEvent {
    Evicted { key: String },
    Expired { key: String },
}

#[derive(Debug, Clone)]
pub enum GcEvent {
    TombstoneRecorded { collection: String, document_id: String },
    RunComplete { scanned: usize, reclaimed: usize },
}

pub trait LockEventSink: Send + Sync {
    fn on_event(&self, event: LockEvent);
}

pub trait TransactionEventSink: Send + Sync {
    fn on_event(&self, event: TransactionEvent);
}

pub trait CacheEventSink: Send + Sync {
    fn on_event(&self, event: CacheEvent);
}

pub trait GcEventSink: Send + Sync {
    fn on_event(&self, event: GcEvent);
}

/// Default no-op sink used when a caller doesn't care to observe events.
pub struct NullSink;

impl LockEventSink for NullSink {
    fn on_event(&self, _event: LockEvent) {}
}
impl TransactionEventSink for NullSink {
    fn on_event(&self, _event: TransactionEvent) {}
}
impl CacheEventSink for NullSink {
    fn on_event(&self, _event: CacheEvent) {}
}
impl GcEventSink for NullSink {
    fn on_event(&self, _event: GcEvent) {}
}

/// Forwards events to an `mpsc` channel so a caller can observe them from
/// another thread without the emitting call blocking on a subscriber.
pub struct ChannelSink<T>(pub Sender<T>);

impl LockEventSink for ChannelSink<LockEvent> {
    fn on_event(&self, event: LockEvent) {
        let _ = self.0.send(event);
    }
}
impl TransactionEventSink for ChannelSink<TransactionEvent> {
    fn on_event(&self, event: TransactionEvent) {
        let _ = self.0.send(event);
    }
}
impl CacheEventSink for ChannelSink<CacheEvent> {
    fn on_event(&self, event: CacheEvent) {
        let _ = self.0.send(event);
    }
}
impl GcEventSink for ChannelSink<GcEvent> {
    fn on_event(&self, event: GcEvent) {
        let _ = self.0.send(event);
    }
}
