//! Write-ahead log (§4.2).

pub mod checkpoint;
pub mod entry;
pub mod reader;
pub mod recovery;
pub mod writer;

pub use checkpoint::{write_checkpoint, CheckpointInfo};
pub use entry::{DataPayload, WalOp, WalRecord};
pub use reader::WalReader;
pub use recovery::{recover, RecoveryResult, RecoveryStats};
pub use writer::WalWriter;

use crate::config::WalConfig;
use crate::error::Result;
use crate::transaction::TransactionId;
use parking_lot::Mutex;

/// Top-level handle a `Database` holds: owns the writer, replays on open,
/// and exposes the record-shaped operations the transaction coordinator
/// needs (`begin`/`insert`/`update`/`delete`/`commit`/`rollback`).
pub struct Wal {
    writer: Mutex<WalWriter>,
    dir: std::path::PathBuf,
}

impl Wal {
    /// Open (creating if absent) the WAL directory, replay committed
    /// transactions since the last checkpoint, and return both the handle
    /// and the recovered operations for the caller to apply to the store.
    pub fn open(config: WalConfig) -> Result<(Self, RecoveryResult)> {
        let dir = config.dir.clone();
        let recovery = recover(&dir)?;
        let writer = WalWriter::open(config, recovery.next_lsn, recovery.segment_seq)?;
        Ok((
            Wal {
                writer: Mutex::new(writer),
                dir,
            },
            recovery,
        ))
    }

    pub fn begin(&self, txn_id: TransactionId) -> Result<u64> {
        self.writer.lock().append(txn_id, WalOp::Begin, Vec::new())
    }

    pub fn log_insert(&self, txn_id: TransactionId, payload: &DataPayload) -> Result<u64> {
        let bytes = serde_json::to_vec(payload)?;
        self.writer.lock().append(txn_id, WalOp::Insert, bytes)
    }

    pub fn log_update(&self, txn_id: TransactionId, payload: &DataPayload) -> Result<u64> {
        let bytes = serde_json::to_vec(payload)?;
        self.writer.lock().append(txn_id, WalOp::Update, bytes)
    }

    pub fn log_delete(&self, txn_id: TransactionId, payload: &DataPayload) -> Result<u64> {
        let bytes = serde_json::to_vec(payload)?;
        self.writer.lock().append(txn_id, WalOp::Delete, bytes)
    }

    pub fn commit(&self, txn_id: TransactionId) -> Result<u64> {
        self.writer.lock().append(txn_id, WalOp::Commit, Vec::new())
    }

    pub fn rollback_marker(&self, txn_id: TransactionId) -> Result<u64> {
        self.writer.lock().append(txn_id, WalOp::Rollback, Vec::new())
    }

    /// LSN the next appended record will receive.
    pub fn next_lsn(&self) -> u64 {
        self.writer.lock().next_lsn()
    }

    /// True once an append, sync, or rotate has failed with an I/O error.
    pub fn is_appender_poisoned(&self) -> bool {
        self.writer.lock().is_poisoned()
    }

    /// Write a checkpoint sidecar recording the current LSN, letting future
    /// recovery skip everything before it.
    pub fn checkpoint(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.sync()?;
        write_checkpoint(
            &self.dir,
            CheckpointInfo {
                lsn: writer.next_lsn(),
                segment_seq: writer.segment_seq(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dir: &std::path::Path) -> WalConfig {
        WalConfig {
            dir: dir.to_path_buf(),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        }
    }

    #[test]
    fn open_on_empty_directory_has_no_recovered_ops() {
        let tmp = tempfile::tempdir().unwrap();
        let (_wal, recovery) = Wal::open(cfg(tmp.path())).unwrap();
        assert!(recovery.committed_ops.is_empty());
    }

    #[test]
    fn reopen_replays_committed_transaction() {
        let tmp = tempfile::tempdir().unwrap();
        let payload = DataPayload {
            collection: "users".into(),
            before: None,
            after: Some(serde_json::json!({"name": "a"})),
        };
        {
            let (wal, _) = Wal::open(cfg(tmp.path())).unwrap();
            wal.begin(1).unwrap();
            wal.log_insert(1, &payload).unwrap();
            wal.commit(1).unwrap();
        }
        let (_wal, recovery) = Wal::open(cfg(tmp.path())).unwrap();
        assert_eq!(recovery.committed_ops.len(), 1);
    }
}
