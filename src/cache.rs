//! Hot-document cache (§6 `CacheConfig`): an LRU cache of recently-touched
//! documents keyed by `(collection, doc_id)`, capped by item count and
//! approximate byte size, with a TTL.
//!
//! Grounded on the donor's `query_cache::QueryCache` (LRU + `parking_lot`
//! `RwLock` + a reverse index for collection-scoped invalidation), but
//! caching whole documents for point lookups instead of query result id
//! lists, and adding the TTL the donor's query cache didn't need. TTL
//! semantics: an entry expires no later than `ttl` after its last write.
//! Expiry is lazy (checked on `get`) plus opportunistic (checked against the
//! single oldest entry when inserting at capacity) rather than a dedicated
//! sweep thread, since the cache is a best-effort accelerator, not a source
//! of truth the GC needs to coordinate with.

use crate::events::{CacheEvent, CacheEventSink, NullSink};
use crate::document::Document;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    document: Document,
    inserted_at: Instant,
    approx_bytes: usize,
}

pub struct DocumentCache {
    inner: Mutex<Inner>,
    max_items: usize,
    max_bytes: usize,
    ttl: Duration,
    sink: Arc<dyn CacheEventSink>,
}

struct Inner {
    lru: LruCache<(String, String), Entry>,
    collection_index: HashMap<String, HashSet<String>>,
    total_bytes: usize,
}

impl DocumentCache {
    pub fn new(max_items: usize, max_bytes: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_items.max(1)).unwrap();
        DocumentCache {
            inner: Mutex::new(Inner {
                lru: LruCache::new(capacity),
                collection_index: HashMap::new(),
                total_bytes: 0,
            }),
            max_items,
            max_bytes,
            ttl,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn CacheEventSink>) -> Self {
        self.sink = sink;
        self
    }

    fn key(collection: &str, doc_id: &str) -> (String, String) {
        (collection.to_string(), doc_id.to_string())
    }

    pub fn get(&self, collection: &str, doc_id: &str) -> Option<Document> {
        let key = Self::key(collection, doc_id);
        let mut inner = self.inner.lock();
        let expired = match inner.lru.peek(&key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            Self::remove_locked(&mut inner, &key);
            self.sink.on_event(CacheEvent::Expired {
                key: format!("{collection}:{doc_id}"),
            });
            return None;
        }
        inner.lru.get(&key).map(|e| e.document.clone())
    }

    pub fn put(&self, collection: &str, document: Document) {
        let key = Self::key(collection, &document.id.as_string());
        let approx_bytes = approximate_size(&document);
        let mut inner = self.inner.lock();

        // Opportunistic sweep: before evicting the real LRU victim, check
        // whether the single oldest entry has already expired on its own —
        // if so, reclaiming it is free and avoids evicting a live entry.
        if inner.lru.len() >= self.max_items || inner.total_bytes + approx_bytes > self.max_bytes {
            if let Some((oldest_key, oldest_entry)) = inner.lru.peek_lru() {
                if oldest_entry.inserted_at.elapsed() >= self.ttl {
                    let oldest_key = oldest_key.clone();
                    Self::remove_locked(&mut inner, &oldest_key);
                    self.sink.on_event(CacheEvent::Expired {
                        key: format!("{}:{}", oldest_key.0, oldest_key.1),
                    });
                }
            }
        }

        if inner.lru.len() >= self.max_items && !inner.lru.contains(&key) {
            if let Some((evicted_key, evicted_entry)) = inner.lru.pop_lru() {
                inner.total_bytes = inner.total_bytes.saturating_sub(evicted_entry.approx_bytes);
                if let Some(set) = inner.collection_index.get_mut(&evicted_key.0) {
                    set.remove(&evicted_key.1);
                }
                self.sink.on_event(CacheEvent::Evicted {
                    key: format!("{}:{}", evicted_key.0, evicted_key.1),
                });
            }
        }

        if let Some(old) = inner.lru.put(
            key.clone(),
            Entry {
                document,
                inserted_at: Instant::now(),
                approx_bytes,
            },
        ) {
            inner.total_bytes = inner.total_bytes.saturating_sub(old.approx_bytes);
        }
        inner.total_bytes += approx_bytes;
        inner
            .collection_index
            .entry(collection.to_string())
            .or_default()
            .insert(key.1.clone());
    }

    pub fn invalidate(&self, collection: &str, doc_id: &str) {
        let key = Self::key(collection, doc_id);
        let mut inner = self.inner.lock();
        Self::remove_locked(&mut inner, &key);
    }

    /// Invalidate every cached document for a collection (e.g. on drop_collection).
    pub fn invalidate_collection(&self, collection: &str) {
        let mut inner = self.inner.lock();
        let ids = inner.collection_index.remove(collection).unwrap_or_default();
        for id in ids {
            let key = (collection.to_string(), id);
            if let Some(entry) = inner.lru.pop(&key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry.approx_bytes);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_locked(inner: &mut Inner, key: &(String, String)) {
        if let Some(entry) = inner.lru.pop(key) {
            inner.total_bytes = inner.total_bytes.saturating_sub(entry.approx_bytes);
            if let Some(set) = inner.collection_index.get_mut(&key.0) {
                set.remove(&key.1);
            }
        }
    }
}

fn approximate_size(document: &Document) -> usize {
    serde_json::to_vec(&document.to_value())
        .map(|v| v.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::thread::sleep;

    fn doc(id: &str) -> Document {
        Document::new_inserted(DocumentId::from(id), BTreeMap::new(), Utc::now())
    }

    #[test]
    fn put_then_get_roundtrips() {
        let cache = DocumentCache::new(10, 1_000_000, Duration::from_secs(60));
        cache.put("users", doc("1"));
        assert!(cache.get("users", "1").is_some());
    }

    #[test]
    fn entry_expires_after_ttl_on_access() {
        let cache = DocumentCache::new(10, 1_000_000, Duration::from_millis(10));
        cache.put("users", doc("1"));
        sleep(Duration::from_millis(30));
        assert!(cache.get("users", "1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_eviction_drops_lru_entry() {
        let cache = DocumentCache::new(2, 1_000_000, Duration::from_secs(60));
        cache.put("users", doc("1"));
        cache.put("users", doc("2"));
        cache.get("users", "1"); // touch 1, making 2 the LRU victim
        cache.put("users", doc("3"));
        assert!(cache.get("users", "2").is_none());
        assert!(cache.get("users", "1").is_some());
        assert!(cache.get("users", "3").is_some());
    }

    #[test]
    fn invalidate_collection_drops_all_its_entries() {
        let cache = DocumentCache::new(10, 1_000_000, Duration::from_secs(60));
        cache.put("users", doc("1"));
        cache.put("users", doc("2"));
        cache.put("orders", doc("3"));
        cache.invalidate_collection("users");
        assert!(cache.get("users", "1").is_none());
        assert!(cache.get("users", "2").is_none());
        assert!(cache.get("orders", "3").is_some());
    }
}
