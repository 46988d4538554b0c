//! Checkpoint sidecar file (§4.2): records the LSN up to which the store's
//! on-disk state is known durable, so recovery can skip replaying records
//! before it. Written via temp-file-then-rename, the same atomic-replace
//! pattern the donor's `wal/writer.rs` `checkpoint()` uses for its catalog
//! snapshot.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CHECKPOINT_FILE: &str = "wal.checkpoint";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub lsn: u64,
    pub segment_seq: u64,
}

pub fn checkpoint_path(dir: &Path) -> PathBuf {
    dir.join(CHECKPOINT_FILE)
}

pub fn write_checkpoint(dir: &Path, info: CheckpointInfo) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!("{CHECKPOINT_FILE}.tmp"));
    let bytes = serde_json::to_vec(&info)?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, checkpoint_path(dir))?;
    Ok(())
}

pub fn read_checkpoint(dir: &Path) -> Result<Option<CheckpointInfo>> {
    let path = checkpoint_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_checkpoint(tmp.path()).unwrap().is_none());
        write_checkpoint(
            tmp.path(),
            CheckpointInfo {
                lsn: 42,
                segment_seq: 3,
            },
        )
        .unwrap();
        let info = read_checkpoint(tmp.path()).unwrap().unwrap();
        assert_eq!(info.lsn, 42);
        assert_eq!(info.segment_seq, 3);
    }
}
