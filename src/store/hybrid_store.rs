//! `MemoryStore` plus a background writer mirroring every change to
//! `<root>/<collection>/<id>.json` (§4.1). Reads never touch disk; writes
//! are applied to memory synchronously and queued for the background
//! writer, so a caller never blocks on I/O but can call `flush()` to wait
//! for the queue to drain before, say, a controlled shutdown.
//!
//! Grounded in the donor's `storage::file_storage` "in-memory state mirrored
//! to disk" split, generalized from the donor's single fixed-format catalog
//! file to one JSON file per document, which better matches this store's
//! collection/document model than the donor's page-offset layout.

use super::{DocumentStore, MemoryStore};
use crate::document::{Document, DocumentId};
use crate::error::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

enum WriteJob {
    Write { collection: String, doc: Document },
    Delete { collection: String, id: String },
    ClearCollection { collection: String },
    DropCollection { collection: String },
    Flush(Sender<()>),
    Shutdown,
}

pub struct HybridStore {
    memory: MemoryStore,
    root: PathBuf,
    tx: Sender<WriteJob>,
    disk_error: Arc<Mutex<Option<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl HybridStore {
    /// Scan `root` for previously persisted documents and materialize them
    /// into memory before accepting new writes.
    pub fn open(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        let memory = MemoryStore::new();
        if root.exists() {
            for entry in std::fs::read_dir(&root)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let collection = entry.file_name().to_string_lossy().to_string();
                memory.create_collection(&collection)?;
                for doc_entry in std::fs::read_dir(entry.path())? {
                    let doc_entry = doc_entry?;
                    let path = doc_entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    let bytes = std::fs::read(&path)?;
                    let doc: Document = serde_json::from_slice(&bytes)?;
                    memory.replace(&collection, doc)?;
                }
            }
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let disk_error = Arc::new(Mutex::new(None));
        let worker_root = root.clone();
        let worker_disk_error = disk_error.clone();
        let handle = std::thread::spawn(move || run_writer(worker_root, rx, worker_disk_error));

        Ok(HybridStore {
            memory,
            root,
            tx,
            disk_error,
            handle: Some(handle),
        })
    }

    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        let _ = self.tx.send(WriteJob::Flush(ack_tx));
        let _ = ack_rx.recv();
        Ok(())
    }

    pub fn disk_error(&self) -> Option<String> {
        self.disk_error.lock().clone()
    }

    pub fn clear_disk_error(&self) {
        *self.disk_error.lock() = None;
    }
}

fn run_writer(root: PathBuf, rx: Receiver<WriteJob>, disk_error: Arc<Mutex<Option<String>>>) {
    for job in rx {
        let outcome: std::io::Result<()> = match job {
            WriteJob::Write { collection, doc } => (|| {
                let dir = root.join(&collection);
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{}.json", doc.id.as_string()));
                let bytes = serde_json::to_vec_pretty(&doc)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                std::fs::write(path, bytes)
            })(),
            WriteJob::Delete { collection, id } => {
                let path = root.join(&collection).join(format!("{id}.json"));
                match std::fs::remove_file(path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e),
                }
            }
            WriteJob::ClearCollection { collection } => {
                let dir = root.join(&collection);
                if dir.exists() {
                    std::fs::remove_dir_all(&dir).and_then(|_| std::fs::create_dir_all(&dir))
                } else {
                    Ok(())
                }
            }
            WriteJob::DropCollection { collection } => {
                let dir = root.join(&collection);
                if dir.exists() {
                    std::fs::remove_dir_all(&dir)
                } else {
                    Ok(())
                }
            }
            WriteJob::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
            WriteJob::Shutdown => break,
        };
        if let Err(e) = outcome {
            let mut guard = disk_error.lock();
            if guard.is_none() {
                *guard = Some(e.to_string());
            }
        }
    }
}

impl Drop for HybridStore {
    fn drop(&mut self) {
        let _ = self.tx.send(WriteJob::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl DocumentStore for HybridStore {
    fn create_collection(&self, name: &str) -> Result<()> {
        self.memory.create_collection(name)
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        self.memory.drop_collection(name)?;
        let _ = self.tx.send(WriteJob::DropCollection {
            collection: name.to_string(),
        });
        Ok(())
    }

    fn insert(&self, collection: &str, doc: Document) -> Result<()> {
        self.memory.insert(collection, doc.clone())?;
        let _ = self.tx.send(WriteJob::Write {
            collection: collection.to_string(),
            doc,
        });
        Ok(())
    }

    fn replace(&self, collection: &str, doc: Document) -> Result<()> {
        self.memory.replace(collection, doc.clone())?;
        let _ = self.tx.send(WriteJob::Write {
            collection: collection.to_string(),
            doc,
        });
        Ok(())
    }

    fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        self.memory.get(collection, id)
    }

    fn delete(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let removed = self.memory.delete(collection, id)?;
        if removed.is_some() {
            let _ = self.tx.send(WriteJob::Delete {
                collection: collection.to_string(),
                id: id.as_string(),
            });
        }
        Ok(removed)
    }

    fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.memory.get_all(collection)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        self.memory.count(collection)
    }

    fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        self.memory.exists(collection, id)
    }

    fn clear_collection(&self, collection: &str) -> Result<()> {
        self.memory.clear_collection(collection)?;
        let _ = self.tx.send(WriteJob::ClearCollection {
            collection: collection.to_string(),
        });
        Ok(())
    }

    fn get_collections(&self) -> Vec<String> {
        self.memory.get_collections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_reopen_recovers_documents() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = HybridStore::open(tmp.path().to_path_buf()).unwrap();
            store.create_collection("users").unwrap();
            store
                .insert(
                    "users",
                    Document::new_inserted(
                        DocumentId::from("1"),
                        std::collections::BTreeMap::new(),
                        chrono::Utc::now(),
                    ),
                )
                .unwrap();
            store.flush().unwrap();
        }
        let reopened = HybridStore::open(tmp.path().to_path_buf()).unwrap();
        assert!(reopened
            .get("users", &DocumentId::from("1"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn delete_then_flush_removes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HybridStore::open(tmp.path().to_path_buf()).unwrap();
        store.create_collection("users").unwrap();
        let doc = Document::new_inserted(
            DocumentId::from("1"),
            std::collections::BTreeMap::new(),
            chrono::Utc::now(),
        );
        store.insert("users", doc).unwrap();
        store.flush().unwrap();
        store.delete("users", &DocumentId::from("1")).unwrap();
        store.flush().unwrap();
        let path = tmp.path().join("users").join("1.json");
        assert!(!path.exists());
    }
}
