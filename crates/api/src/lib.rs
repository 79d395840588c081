//! Newsfeed collaborator boundary.
//!
//! This crate defines the traits the engine depends on for everything it does
//! not own: page fetching, the user profile, raw resource bytes and text
//! measurement. Transport, auth and JSON mapping live behind these traits.

#![forbid(unsafe_code)]

use bytes::Bytes;
use newsfeed_core::{FeedQuery, FeedResult, Page, TextArea, User};

pub mod mock;

pub use mock::{sample_item, sample_page, MockApi, ScriptedMeasure};

/// Remote feed endpoints.
#[async_trait::async_trait]
pub trait FeedApi: Send + Sync {
    /// Fetch one page for `query`. Called at most once per pagination transition.
    async fn fetch_feed(&self, query: FeedQuery) -> FeedResult<Page>;

    /// Fetch the signed-in user's profile (avatar locator).
    async fn fetch_user(&self) -> FeedResult<User>;
}

/// Raw resource bytes by locator (avatars, photos).
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> FeedResult<Bytes>;
}

/// Text layout oracle supplied by the presentation layer. Synchronous,
/// called on the control thread.
pub trait TextMeasure: Send + Sync {
    fn measure(&self, text: &str, width: f32) -> TextArea;
}
