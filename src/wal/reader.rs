//! Sequential WAL reader used by both `recovery` and lazy replay (§4.2).
//!
//! Mirrors the donor's `wal/reader.rs` streaming-iterator shape: a record at
//! a time, stopping at the first malformed record rather than erroring,
//! since a torn trailing record is the expected signature of a crash mid-
//! write rather than real corruption.

use super::entry::WalRecord;
use crate::error::Result;
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct WalReader {
    buf: Vec<u8>,
    offset: usize,
}

impl WalReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut buf = Vec::new();
        if path.exists() {
            std::fs::File::open(path)?.read_to_end(&mut buf)?;
        }
        Ok(WalReader { buf, offset: 0 })
    }

    /// Read every segment in LSN order: sealed segments (oldest first) then
    /// the current, still-open segment.
    pub fn open_dir(dir: &Path) -> Result<Self> {
        let mut buf = Vec::new();
        let mut paths: Vec<PathBuf> = super::writer::WalWriter::sealed_segments(dir)?;
        let current = dir.join("wal.current");
        if current.exists() {
            paths.push(current);
        }
        for path in paths {
            let mut chunk = Vec::new();
            std::fs::File::open(&path)?.read_to_end(&mut chunk)?;
            buf.extend_from_slice(&chunk);
        }
        Ok(WalReader { buf, offset: 0 })
    }
}

impl Iterator for WalReader {
    type Item = WalRecord;

    fn next(&mut self) -> Option<WalRecord> {
        if self.offset >= self.buf.len() {
            return None;
        }
        match WalRecord::deserialize(&self.buf[self.offset..]) {
            Ok((record, consumed)) => {
                self.offset += consumed;
                Some(record)
            }
            Err(_) => {
                // Torn or corrupt tail: stop here, treat as end of log.
                self.offset = self.buf.len();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::entry::WalOp;
    use crate::wal::writer::WalWriter;
    use crate::config::WalConfig;

    #[test]
    fn reads_back_appended_records_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = WalConfig {
            dir: tmp.path().to_path_buf(),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        };
        {
            let mut writer = WalWriter::open(cfg.clone(), 1, 0).unwrap();
            writer.append(1, WalOp::Begin, vec![]).unwrap();
            writer.append(1, WalOp::Commit, vec![]).unwrap();
        }
        let reader = WalReader::open_dir(tmp.path()).unwrap();
        let records: Vec<_> = reader.collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].op, WalOp::Begin);
        assert_eq!(records[1].op, WalOp::Commit);
    }

    #[test]
    fn stops_at_truncated_tail_without_erroring() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = WalConfig {
            dir: tmp.path().to_path_buf(),
            force_sync: true,
            max_file_size: u64::MAX,
            buffer_size: 4096,
        };
        {
            let mut writer = WalWriter::open(cfg.clone(), 1, 0).unwrap();
            writer.append(1, WalOp::Begin, vec![]).unwrap();
        }
        let path = tmp.path().join("wal.current");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 2);
        std::fs::write(&path, bytes).unwrap();

        let reader = WalReader::open_dir(tmp.path()).unwrap();
        let records: Vec<_> = reader.collect();
        assert!(records.is_empty());
    }
}
