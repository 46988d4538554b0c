//! Crash recovery (§4.2): replay the WAL from the last checkpoint and
//! classify every transaction seen as committed, aborted/rolled-back, or
//! incomplete (began but neither committed nor rolled back before the log
//! ends — the donor's `recovery/mod.rs` calls these "dangling" transactions).
//! Incomplete transactions are discarded; their operations are never applied.

use super::checkpoint::{read_checkpoint, CheckpointInfo};
use super::entry::{DataPayload, WalOp, WalRecord};
use super::reader::WalReader;
use crate::error::Result;
use crate::transaction::TransactionId;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Default)]
pub struct RecoveryStats {
    pub records_scanned: usize,
    pub committed: usize,
    pub rolled_back: usize,
    pub incomplete: usize,
}

#[derive(Debug, Default)]
pub struct RecoveryResult {
    pub committed_ops: Vec<(TransactionId, DataPayload, WalOp)>,
    pub next_lsn: u64,
    pub segment_seq: u64,
    pub stats: RecoveryStats,
}

/// Scan the WAL directory and reconstruct the set of operations belonging
/// to transactions that committed, in commit order. Operations belonging to
/// rolled-back, aborted, or never-finished transactions are dropped.
pub fn recover(dir: &Path) -> Result<RecoveryResult> {
    let checkpoint: Option<CheckpointInfo> = read_checkpoint(dir)?;
    let starting_segment_seq = checkpoint.map(|c| c.segment_seq).unwrap_or(0);

    let reader = WalReader::open_dir(dir)?;
    let mut pending: HashMap<TransactionId, Vec<WalRecord>> = HashMap::new();
    let mut committed: HashSet<TransactionId> = HashSet::new();
    let mut finished: HashSet<TransactionId> = HashSet::new();
    let mut ordered_committed: Vec<TransactionId> = Vec::new();

    let mut stats = RecoveryStats::default();
    let mut max_lsn = checkpoint.map(|c| c.lsn).unwrap_or(0);

    for record in reader {
        stats.records_scanned += 1;
        max_lsn = max_lsn.max(record.lsn);
        match record.op {
            WalOp::Begin => {
                pending.entry(record.txn_id).or_default();
            }
            WalOp::Insert | WalOp::Update | WalOp::Delete => {
                pending.entry(record.txn_id).or_default().push(record);
            }
            WalOp::Commit => {
                committed.insert(record.txn_id);
                finished.insert(record.txn_id);
                ordered_committed.push(record.txn_id);
                stats.committed += 1;
            }
            WalOp::Rollback => {
                finished.insert(record.txn_id);
                pending.remove(&record.txn_id);
                stats.rolled_back += 1;
            }
            WalOp::Checkpoint => {}
        }
    }

    for txn_id in pending.keys() {
        if !finished.contains(txn_id) {
            stats.incomplete += 1;
        }
    }

    let mut committed_ops = Vec::new();
    for txn_id in ordered_committed {
        if let Some(records) = pending.remove(&txn_id) {
            for record in records {
                let payload = record.data_payload()?;
                committed_ops.push((txn_id, payload, record.op));
            }
        }
    }

    Ok(RecoveryResult {
        committed_ops,
        next_lsn: max_lsn + 1,
        segment_seq: starting_segment_seq,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalConfig;
    use crate::wal::writer::WalWriter;

    fn cfg(dir: &Path) -> WalConfig {
        WalConfig {
            dir: dir.to_path_buf(),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        }
    }

    #[test]
    fn committed_transaction_is_replayed_rolled_back_is_not() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut writer = WalWriter::open(cfg(tmp.path()), 1, 0).unwrap();
            writer.append(1, WalOp::Begin, vec![]).unwrap();
            let payload = DataPayload {
                collection: "users".into(),
                before: None,
                after: Some(serde_json::json!({"name": "a"})),
            };
            writer
                .append(1, WalOp::Insert, serde_json::to_vec(&payload).unwrap())
                .unwrap();
            writer.append(1, WalOp::Commit, vec![]).unwrap();

            writer.append(2, WalOp::Begin, vec![]).unwrap();
            writer
                .append(2, WalOp::Insert, serde_json::to_vec(&payload).unwrap())
                .unwrap();
            writer.append(2, WalOp::Rollback, vec![]).unwrap();
        }
        let result = recover(tmp.path()).unwrap();
        assert_eq!(result.committed_ops.len(), 1);
        assert_eq!(result.stats.committed, 1);
        assert_eq!(result.stats.rolled_back, 1);
    }

    #[test]
    fn incomplete_transaction_is_discarded() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut writer = WalWriter::open(cfg(tmp.path()), 1, 0).unwrap();
            writer.append(5, WalOp::Begin, vec![]).unwrap();
            writer.append(5, WalOp::Insert, vec![1, 2, 3]).unwrap();
        }
        let result = recover(tmp.path()).unwrap();
        assert!(result.committed_ops.is_empty());
        assert_eq!(result.stats.incomplete, 1);
    }
}
