use std::collections::VecDeque;

use bytes::Bytes;
use newsfeed_core::ContentKey;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: ContentKey,
    pub bytes: Bytes,
    /// Logical access tick; larger is more recent.
    pub last_access: u64,
}

/// Recency-bounded map. `order` is an access log with lazy deletion: a record
/// is live only while its tick matches the entry's `last_access`.
pub struct MemoryTier {
    map: FxHashMap<ContentKey, CacheEntry>,
    order: VecDeque<(ContentKey, u64)>,
    cap: usize,
    tick: u64,
    evicted: u64,
}

impl MemoryTier {
    pub fn with_capacity(cap: usize) -> Self {
        Self { map: FxHashMap::default(), order: VecDeque::new(), cap: cap.max(1), tick: 0, evicted: 0 }
    }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
    pub fn evicted(&self) -> u64 { self.evicted }
    pub fn contains(&self, key: &ContentKey) -> bool { self.map.contains_key(key) }

    pub fn get(&mut self, key: &ContentKey) -> Option<Bytes> {
        let tick = self.next_tick();
        let entry = self.map.get_mut(key)?;
        entry.last_access = tick;
        let bytes = entry.bytes.clone();
        self.order.push_back((*key, tick));
        self.compact();
        Some(bytes)
    }

    pub fn insert(&mut self, key: ContentKey, bytes: Bytes) {
        let tick = self.next_tick();
        self.map.insert(key, CacheEntry { key, bytes, last_access: tick });
        self.order.push_back((key, tick));
        while self.map.len() > self.cap {
            let Some((old, t)) = self.order.pop_front() else { break };
            let live = self.map.get(&old).map(|e| e.last_access == t).unwrap_or(false);
            if live {
                self.map.remove(&old);
                self.evicted += 1;
            }
        }
        self.compact();
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // Drop dead log records once they dominate; keeps every op amortized O(1).
    fn compact(&mut self) {
        if self.order.len() <= self.cap.saturating_mul(2) + 16 {
            return;
        }
        let map = &self.map;
        self.order.retain(|(k, t)| map.get(k).map(|e| e.last_access == *t).unwrap_or(false));
    }
}
