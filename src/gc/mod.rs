//! Tombstone-based garbage collector (§4.8).
//!
//! The donor's `storage::compaction` module rewrites the whole backing file
//! to drop tombstoned documents in one big pass and reports a `CompactionStats`
//! summary. This crate's documents already live one-file-per-document, so
//! there's no file to rewrite — collection is reduced to "delete the files
//! whose tombstone has aged past retention", done incrementally in bounded
//! batches rather than one sweep, with a `CollectionRun` summary playing the
//! same role `CompactionStats` did for the donor.

use crate::events::{GcEvent, GcEventSink, NullSink};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Tombstone {
    pub collection: String,
    pub document_id: String,
    pub version: u64,
    pub deleted_at: DateTime<Utc>,
    pub file_path: Option<PathBuf>,
    pub transaction_id: Option<u64>,
}

/// Summary of a single collection pass, mirroring the donor's `CompactionStats`.
#[derive(Debug, Clone, Default)]
pub struct CollectionRun {
    pub scanned: usize,
    pub reclaimed: usize,
    pub skipped_not_due: usize,
    pub missing_files: usize,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct Cumulative {
    total_reclaimed: AtomicU64,
    total_runs: AtomicU64,
}

pub struct GarbageCollector {
    tombstones: DashMap<(String, String), Tombstone>,
    enabled: bool,
    retention: Duration,
    max_per_run: usize,
    cumulative: Cumulative,
    sink: Arc<dyn GcEventSink>,
    sticky_failure: AtomicBool,
}

impl GarbageCollector {
    pub fn new(enabled: bool, retention: Duration, max_per_run: usize) -> Self {
        GarbageCollector {
            tombstones: DashMap::new(),
            enabled,
            retention,
            max_per_run,
            cumulative: Cumulative::default(),
            sink: Arc::new(NullSink),
            sticky_failure: AtomicBool::new(false),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn GcEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set once a reclaim attempt has failed with something other than
    /// "file already gone" (e.g. a permissions error) — surfaced via
    /// `Database::health()` rather than retried automatically, since a
    /// GC failure should not silently stall future sweeps.
    pub fn has_sticky_failure(&self) -> bool {
        self.sticky_failure.load(Ordering::Relaxed)
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Record a deletion. A duplicate record for the same id updates version
    /// and timestamp rather than accumulating duplicates.
    pub fn record_deletion(&self, tombstone: Tombstone) {
        if !self.enabled {
            return;
        }
        let key = (tombstone.collection.clone(), tombstone.document_id.clone());
        self.sink.on_event(GcEvent::TombstoneRecorded {
            collection: tombstone.collection.clone(),
            document_id: tombstone.document_id.clone(),
        });
        self.tombstones.insert(key, tombstone);
    }

    /// Run one bounded sweep: reclaims tombstones whose `deleted_at +
    /// retention` has elapsed, up to `max_per_run`, checking `cancelled`
    /// between each file removal so a mid-run cancellation leaves earlier
    /// work in place.
    pub fn run_once(&self, cancelled: &AtomicBool) -> CollectionRun {
        let mut run = CollectionRun::default();
        if !self.enabled {
            return run;
        }

        let now = Utc::now();
        let due: Vec<(String, String)> = self
            .tombstones
            .iter()
            .filter_map(|entry| {
                let t = entry.value();
                if now.signed_duration_since(t.deleted_at).to_std().unwrap_or_default() >= self.retention {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .take(self.max_per_run)
            .collect();

        run.scanned = due.len();

        for key in due {
            if cancelled.load(Ordering::Relaxed) {
                run.cancelled = true;
                break;
            }
            if let Some((_, tombstone)) = self.tombstones.remove(&key) {
                match &tombstone.file_path {
                    Some(path) => match std::fs::remove_file(path) {
                        Ok(()) => run.reclaimed += 1,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => run.missing_files += 1,
                        Err(_) => {
                            run.missing_files += 1;
                            self.sticky_failure.store(true, Ordering::Relaxed);
                        }
                    },
                    None => run.reclaimed += 1,
                }
            }
        }

        self.cumulative
            .total_reclaimed
            .fetch_add(run.reclaimed as u64, Ordering::Relaxed);
        self.cumulative.total_runs.fetch_add(1, Ordering::Relaxed);
        self.sink.on_event(GcEvent::RunComplete {
            scanned: run.scanned,
            reclaimed: run.reclaimed,
        });
        run
    }

    pub fn total_reclaimed(&self) -> u64 {
        self.cumulative.total_reclaimed.load(Ordering::Relaxed)
    }

    pub fn total_runs(&self) -> u64 {
        self.cumulative.total_runs.load(Ordering::Relaxed)
    }
}
