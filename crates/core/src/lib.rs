//! Newsfeed core types shared by every other crate in the workspace.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod decode;
pub mod format;
mod key;

pub use key::ContentKey;

/// Seconds since the unix epoch.
pub type Timestamp = i64;

/// Errors surfaced by collaborators and the resource pipeline.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("cache write: {0}")]
    CacheWrite(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Query for one feed page. `window_start` stays fixed for a pagination session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedQuery {
    pub window_start: Timestamp,
    pub cursor: Option<String>,
}

impl FeedQuery {
    /// Fresh session: no cursor, window opened `window_days` before `now`.
    pub fn begin(now: Timestamp, window_days: u32) -> Self {
        let window_start = now.saturating_sub(i64::from(window_days) * 24 * 60 * 60);
        Self { window_start, cursor: None }
    }

    /// Same session, continued from `cursor`.
    pub fn resume(&self, cursor: Option<String>) -> Self {
        Self { window_start: self.window_start, cursor }
    }
}

/// Author of a feed item (a profile or a group).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub image_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub image_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub source: Source,
    pub date: Timestamp,
    pub text: String,
    pub attachments: SmallVec<[Attachment; 4]>,
    pub likes: i64,
    pub comments: i64,
    pub reposts: i64,
    pub views: i64,
}

/// One page of the feed. `next_cursor == None` means the feed is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
}

/// Signed-in user profile; only the avatar is consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub image_link: String,
}

/// Result of a text measurement at a given width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TextArea {
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
}

pub mod prelude {
    pub use super::{
        Attachment, ContentKey, FeedError, FeedItem, FeedQuery, FeedResult, Page, Source, TextArea,
        Timestamp, User,
    };
}

pub fn now_ts() -> Timestamp {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as i64
}
