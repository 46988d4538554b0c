//! Append-only WAL segment writer with rotation (§4.2).
//!
//! Grounded in the donor's `wal/writer.rs`, which kept a single open file
//! handle and `fsync`'d on commit; this version adds segment rotation once
//! `max_file_size` is exceeded (donor had one unbounded `wal.log`) and keeps
//! `force_sync` as a config knob rather than a hardcoded always-on behavior.

use super::entry::{WalOp, WalRecord};
use crate::config::WalConfig;
use crate::error::Result;
use crate::transaction::TransactionId;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const CURRENT_SEGMENT_NAME: &str = "wal.current";

pub struct WalWriter {
    dir: PathBuf,
    config: WalConfig,
    file: BufWriter<File>,
    bytes_written: u64,
    next_lsn: u64,
    segment_seq: u64,
    poisoned: AtomicBool,
}

impl WalWriter {
    pub fn open(config: WalConfig, starting_lsn: u64, segment_seq: u64) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let path = config.dir.join(CURRENT_SEGMENT_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let bytes_written = file.metadata()?.len();
        Ok(WalWriter {
            dir: config.dir.clone(),
            config,
            file: BufWriter::new(file),
            bytes_written,
            next_lsn: starting_lsn,
            segment_seq,
            poisoned: AtomicBool::new(false),
        })
    }

    /// Set once an append/sync/rotate call has returned an I/O error.
    /// `Database::health()` surfaces this so a caller can stop issuing
    /// writes against a WAL directory that has started failing rather than
    /// silently losing durability.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_SEGMENT_NAME)
    }

    /// Append a record, returning its assigned LSN. `Commit`, `Rollback`, and
    /// `Checkpoint` records always `fsync`; others honor `force_sync`.
    pub fn append(&mut self, txn_id: TransactionId, op: WalOp, payload: Vec<u8>) -> Result<u64> {
        match self.append_inner(txn_id, op, payload) {
            Ok(lsn) => Ok(lsn),
            Err(e) => {
                self.poisoned.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    fn append_inner(&mut self, txn_id: TransactionId, op: WalOp, payload: Vec<u8>) -> Result<u64> {
        let lsn = self.next_lsn;
        self.next_lsn += 1;
        let record = WalRecord {
            lsn,
            txn_id,
            op,
            timestamp: chrono::Utc::now(),
            payload,
        };
        let bytes = record.serialize();
        self.file.write_all(&bytes)?;
        self.bytes_written += bytes.len() as u64;

        let must_sync = self.config.force_sync
            || matches!(op, WalOp::Commit | WalOp::Rollback | WalOp::Checkpoint);
        if must_sync {
            self.sync()?;
        }
        if self.bytes_written >= self.config.max_file_size {
            self.rotate()?;
        }
        Ok(lsn)
    }

    pub fn sync(&mut self) -> Result<()> {
        match self.file.flush().and_then(|_| self.file.get_ref().sync_data()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.poisoned.store(true, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Seal the current segment under a name carrying its LSN range and
    /// start a fresh `wal.current`. Rotation happens after a sync point so
    /// the sealed segment never ends mid-record.
    fn rotate(&mut self) -> Result<()> {
        self.sync()?;
        let sealed_name = format!("wal.{:020}.seg", self.segment_seq);
        let sealed_path = self.dir.join(&sealed_name);
        std::fs::rename(self.current_path(), &sealed_path)?;
        self.segment_seq += 1;

        let new_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;
        self.file = BufWriter::new(new_file);
        self.bytes_written = 0;
        Ok(())
    }

    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }

    pub fn segment_seq(&self) -> u64 {
        self.segment_seq
    }

    pub fn sealed_segments(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut segments = Vec::new();
        if !dir.exists() {
            return Ok(segments);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("wal.") && name.ends_with(".seg") {
                segments.push(entry.path());
            }
        }
        segments.sort();
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::entry::DataPayload;

    fn cfg(dir: &Path) -> WalConfig {
        WalConfig {
            dir: dir.to_path_buf(),
            force_sync: false,
            max_file_size: 128,
            buffer_size: 4096,
        }
    }

    #[test]
    fn append_assigns_increasing_lsns() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = WalWriter::open(cfg(tmp.path()), 1, 0).unwrap();
        let payload = DataPayload {
            collection: "c".into(),
            before: None,
            after: Some(serde_json::json!({"x": 1})),
        };
        let lsn1 = writer
            .append(1, WalOp::Insert, serde_json::to_vec(&payload).unwrap())
            .unwrap();
        let lsn2 = writer
            .append(1, WalOp::Insert, serde_json::to_vec(&payload).unwrap())
            .unwrap();
        assert_eq!(lsn1, 1);
        assert_eq!(lsn2, 2);
    }

    #[test]
    fn rotation_seals_segments_past_max_size() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = WalWriter::open(cfg(tmp.path()), 1, 0).unwrap();
        let big_payload = vec![0u8; 200];
        for _ in 0..3 {
            writer.append(1, WalOp::Insert, big_payload.clone()).unwrap();
        }
        let sealed = WalWriter::sealed_segments(tmp.path()).unwrap();
        assert!(!sealed.is_empty());
    }
}
