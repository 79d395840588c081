use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, histogram};
use newsfeed_api::ResourceFetcher;
use newsfeed_core::ContentKey;
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::resource::ResourceCache;

type Delivery = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// Single-flight resource loader. Requests for a key already in flight join
/// the pending group; each group resolves with one cache lookup and at most
/// one network fetch. Deliveries always run on the runtime, never inside
/// `request`. Failures deliver nothing.
#[derive(Clone)]
pub struct LoadCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    cache: ResourceCache,
    fetcher: Arc<dyn ResourceFetcher>,
    inflight: Mutex<FxHashMap<ContentKey, Vec<Delivery>>>,
    rt: Handle,
}

impl LoadCoordinator {
    pub fn new(cache: ResourceCache, fetcher: Arc<dyn ResourceFetcher>, rt: Handle) -> Self {
        Self { inner: Arc::new(Inner { cache, fetcher, inflight: Mutex::new(FxHashMap::default()), rt }) }
    }

    pub fn cache(&self) -> &ResourceCache { &self.inner.cache }

    /// Number of keys with a pending load.
    pub fn in_flight(&self) -> usize { self.inner.waiters().len() }

    pub fn request<F>(&self, locator: &str, on_delivery: F)
    where
        F: FnOnce(Bytes) + Send + 'static,
    {
        let key = ContentKey::of(locator);
        {
            let mut inflight = self.inner.waiters();
            if let Some(group) = inflight.get_mut(&key) {
                group.push(Box::new(on_delivery));
                counter!("resource_coalesced_total", 1u64);
                debug!(key = %key, waiters = group.len(), "joined in-flight load");
                return;
            }
            inflight.insert(key, vec![Box::new(on_delivery)]);
        }
        let inner = Arc::clone(&self.inner);
        let locator = locator.to_string();
        self.inner.rt.spawn(async move { inner.load(locator, key).await });
    }
}

impl Inner {
    fn waiters(&self) -> std::sync::MutexGuard<'_, FxHashMap<ContentKey, Vec<Delivery>>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn load(&self, locator: String, key: ContentKey) {
        let pending = PendingGroup { inner: self, key, settled: false };
        let bytes = match self.cache.get(&key).await {
            Some(hit) => {
                counter!("resource_cache_hit_total", 1u64);
                Some(hit)
            }
            None => {
                let started = Instant::now();
                counter!("resource_fetch_total", 1u64);
                match self.fetcher.fetch(&locator).await {
                    Ok(b) => {
                        histogram!("resource_fetch_ms", started.elapsed().as_secs_f64() * 1000.0);
                        // populate before releasing the group so late requests hit memory
                        self.cache.put(key, b.clone());
                        Some(b)
                    }
                    Err(e) => {
                        counter!("resource_fetch_errors_total", 1u64);
                        warn!(locator = %locator, error = %e, "resource fetch failed");
                        None
                    }
                }
            }
        };
        let group = pending.settle();
        match bytes {
            Some(b) => {
                for deliver in group {
                    deliver(b.clone());
                }
            }
            None => debug!(key = %key, dropped = group.len(), "no delivery"),
        }
    }
}

/// Owns a key's waiter group for the lifetime of its load. A load that never
/// settles (task aborted, fetcher panicked) clears the group on drop so the
/// next request for the key starts over.
struct PendingGroup<'a> {
    inner: &'a Inner,
    key: ContentKey,
    settled: bool,
}

impl PendingGroup<'_> {
    fn settle(mut self) -> Vec<Delivery> {
        self.settled = true;
        self.inner.waiters().remove(&self.key).unwrap_or_default()
    }
}

impl Drop for PendingGroup<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let abandoned = self.inner.waiters().remove(&self.key);
        if let Some(group) = abandoned {
            warn!(key = %self.key, dropped = group.len(), "resource load abandoned");
        }
    }
}
