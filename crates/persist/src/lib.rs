//! Newsfeed persistence: the persistent tier of the resource cache.
//! Blobs are addressed by `ContentKey`; callers treat every write as best-effort.

#![forbid(unsafe_code)]

use anyhow::Result;
use newsfeed_core::ContentKey;

mod dir;
mod mem;
mod sqlite;

pub use dir::DirStore;
pub use mem::MemStore;
pub use sqlite::SqliteStore;

/// Persistent blob tier. Synchronous; callers run it off the control thread.
pub trait BlobStore: Send + Sync {
    fn read(&self, key: &ContentKey) -> Result<Option<Vec<u8>>>;
    fn write(&self, key: &ContentKey, bytes: &[u8]) -> Result<()>;
    /// Keep the `keep` most recently used blobs, delete the rest. Returns rows removed.
    fn trim(&self, keep: usize) -> Result<usize>;
}

pub fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}
