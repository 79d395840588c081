use std::sync::{Arc, Mutex};

use bytes::Bytes;
use metrics::counter;
use newsfeed_core::{ContentKey, FeedError};
use newsfeed_persist::BlobStore;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::memory::MemoryTier;

/// Keyed blob cache: a locked memory tier in front of an optional persistent tier.
/// Persistent writes are scheduled on the blocking pool and never fail the caller.
pub struct ResourceCache {
    memory: Mutex<MemoryTier>,
    persistent: Option<Arc<dyn BlobStore>>,
    rt: Handle,
}

impl ResourceCache {
    pub fn new(capacity: usize, persistent: Option<Arc<dyn BlobStore>>, rt: Handle) -> Self {
        Self { memory: Mutex::new(MemoryTier::with_capacity(capacity)), persistent, rt }
    }

    pub fn memory_only(capacity: usize, rt: Handle) -> Self { Self::new(capacity, None, rt) }

    fn memory(&self) -> std::sync::MutexGuard<'_, MemoryTier> {
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn memory_len(&self) -> usize { self.memory().len() }

    /// Memory tier only; never blocks on I/O.
    pub fn get_memory(&self, key: &ContentKey) -> Option<Bytes> { self.memory().get(key) }

    /// Memory tier, then the persistent tier off-thread. Persistent hits are
    /// promoted into memory. Read failures count as a miss.
    pub async fn get(&self, key: &ContentKey) -> Option<Bytes> {
        if let Some(hit) = self.get_memory(key) {
            return Some(hit);
        }
        let store = self.persistent.clone()?;
        let k = *key;
        let read = self.rt.spawn_blocking(move || store.read(&k)).await;
        let bytes = match read {
            Ok(Ok(Some(v))) => Bytes::from(v),
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "persistent read failed");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "persistent read task failed");
                return None;
            }
        };
        let mut mem = self.memory();
        // a concurrent put wins over what we read from disk
        if let Some(fresh) = mem.get(key) {
            return Some(fresh);
        }
        mem.insert(*key, bytes.clone());
        debug!(key = %key, "promoted from persistent tier");
        Some(bytes)
    }

    /// Store in memory now; schedule the persistent write.
    pub fn put(&self, key: ContentKey, bytes: Bytes) {
        self.memory().insert(key, bytes.clone());
        let Some(store) = self.persistent.clone() else { return };
        self.rt.spawn_blocking(move || {
            if let Err(e) = store.write(&key, &bytes) {
                let err = FeedError::CacheWrite(e.to_string());
                warn!(key = %key, error = %err, "resource not persisted");
                counter!("cache_write_errors_total", 1u64);
            }
        });
    }

    /// Schedule a trim of the persistent tier down to `keep` blobs.
    pub fn trim_persistent(&self, keep: usize) {
        let Some(store) = self.persistent.clone() else { return };
        self.rt.spawn_blocking(move || match store.trim(keep) {
            Ok(removed) => debug!(removed, keep, "persistent tier trimmed"),
            Err(e) => warn!(error = %e, "persistent trim failed"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsfeed_persist::MemStore;
    use std::time::Duration;

    async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn put_writes_through() {
        let store = Arc::new(MemStore::new());
        let cache = ResourceCache::new(8, Some(store.clone()), Handle::current());
        let key = ContentKey::of("https://img/a.jpg");
        cache.put(key, Bytes::from_static(b"a"));
        assert_eq!(cache.get_memory(&key).unwrap().as_ref(), b"a");
        assert!(wait_for(|| store.len() == 1).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn persistent_hit_is_promoted() {
        let store = Arc::new(MemStore::new());
        let key = ContentKey::of("https://img/b.jpg");
        store.write(&key, b"disk").unwrap();
        let cache = ResourceCache::new(8, Some(store.clone()), Handle::current());
        assert!(cache.get_memory(&key).is_none());
        assert_eq!(cache.get(&key).await.unwrap().as_ref(), b"disk");
        assert_eq!(cache.memory_len(), 1);
        let reads = store.reads();
        assert_eq!(cache.get(&key).await.unwrap().as_ref(), b"disk");
        assert_eq!(store.reads(), reads);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_persistent_write_keeps_memory_copy() {
        let store = Arc::new(MemStore::new());
        store.set_failing(true);
        let cache = ResourceCache::new(8, Some(store.clone()), Handle::current());
        let key = ContentKey::of("https://img/c.jpg");
        cache.put(key, Bytes::from_static(b"c"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.is_empty());
        assert_eq!(cache.get(&key).await.unwrap().as_ref(), b"c");
    }

    #[tokio::test]
    async fn miss_without_persistent_tier() {
        let cache = ResourceCache::memory_only(4, Handle::current());
        assert!(cache.get(&ContentKey::of("nope")).await.is_none());
    }
}
