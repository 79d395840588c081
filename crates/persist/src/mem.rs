use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use newsfeed_core::ContentKey;

use crate::BlobStore;

/// Process-local tier, mostly for tests. `set_failing(true)` makes every write
/// fail so callers can exercise their degradation path.
#[derive(Default)]
pub struct MemStore {
    blobs: Mutex<HashMap<ContentKey, (Vec<u8>, u64)>>,
    tick: AtomicU64,
    failing: AtomicBool,
    reads: AtomicU64,
}

impl MemStore {
    pub fn new() -> Self { Self::default() }

    pub fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

    pub fn len(&self) -> usize { self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn reads(&self) -> u64 { self.reads.load(Ordering::SeqCst) }

    fn next_tick(&self) -> u64 { self.tick.fetch_add(1, Ordering::SeqCst) }
}

impl BlobStore for MemStore {
    fn read(&self, key: &ContentKey) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tick = self.next_tick();
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get_mut(key).map(|(bytes, last)| {
            *last = tick;
            bytes.clone()
        }))
    }

    fn write(&self, key: &ContentKey, bytes: &[u8]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("mem store: write rejected for {}", key);
        }
        let tick = self.next_tick();
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).insert(*key, (bytes.to_vec(), tick));
        Ok(())
    }

    fn trim(&self, keep: usize) -> Result<usize> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        if blobs.len() <= keep {
            return Ok(0);
        }
        let mut ticks: Vec<(u64, ContentKey)> = blobs.iter().map(|(k, (_, t))| (*t, *k)).collect();
        ticks.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let removed = ticks.len() - keep;
        for (_, k) in ticks.into_iter().skip(keep) {
            blobs.remove(&k);
        }
        Ok(removed)
    }
}
