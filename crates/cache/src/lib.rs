//! Newsfeed resource loading: a memory tier over a persistent tier, and a
//! coordinator that coalesces concurrent requests for the same content key.

#![forbid(unsafe_code)]

mod coordinator;
mod memory;
mod resource;

pub use coordinator::LoadCoordinator;
pub use memory::{CacheEntry, MemoryTier};
pub use resource::ResourceCache;
