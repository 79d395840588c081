use std::ops::Range;

use bytes::Bytes;
use newsfeed_core::{FeedError, FeedResult, Page, User};
use newsfeed_store::ResourceTarget;

use crate::pagination::FetchKind;
use crate::slots::SlotId;

/// Events for the presentation layer, in the order the control thread applied them.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A page was appended at exactly these indices.
    PageInserted { range: Range<usize> },
    /// A refresh replaced the whole feed.
    Reloaded { len: usize },
    /// A page fetch failed; `initial` when nothing has been shown yet.
    PaginationFailed { kind: FetchKind, initial: bool, error: FeedError },
    CardHeightChanged { index: usize },
    SlotResourceReady { slot: SlotId, index: usize, target: ResourceTarget },
    ProfileImage { bytes: Bytes },
}

/// Results produced off the control thread, queued until `pump`.
#[derive(Debug)]
pub(crate) enum Update {
    Page { kind: FetchKind, result: FeedResult<Page> },
    Resource { slot: SlotId, generation: u64, index: usize, version: u64, target: ResourceTarget, bytes: Bytes },
    Profile(FeedResult<User>),
    ProfileImage { generation: u64, bytes: Bytes },
}

#[derive(Default)]
pub(crate) struct ProfileState {
    pub requested: bool,
    pub generation: u64,
    pub image: Option<Bytes>,
}
