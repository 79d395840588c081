//! In-memory collaborators for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use newsfeed_core::{
    Attachment, FeedError, FeedItem, FeedQuery, FeedResult, Page, Source, TextArea, User,
};
use smallvec::SmallVec;
use tracing::debug;

use crate::{FeedApi, ResourceFetcher, TextMeasure};

/// Scriptable feed + resource backend. Pages are served FIFO; an empty queue
/// serves an empty, exhausted page.
pub struct MockApi {
    pages: Mutex<VecDeque<FeedResult<Page>>>,
    queries: Mutex<Vec<FeedQuery>>,
    feed_delay: Duration,
    feed_in_flight: AtomicUsize,
    feed_max_in_flight: AtomicUsize,
    user: Mutex<Option<FeedResult<User>>>,
    resources: Mutex<HashMap<String, Bytes>>,
    resource_delays: HashMap<String, Duration>,
    resource_calls: Mutex<HashMap<String, usize>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            pages: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            feed_delay: Duration::from_millis(0),
            feed_in_flight: AtomicUsize::new(0),
            feed_max_in_flight: AtomicUsize::new(0),
            user: Mutex::new(None),
            resources: Mutex::new(HashMap::new()),
            resource_delays: HashMap::new(),
            resource_calls: Mutex::new(HashMap::new()),
        }
    }
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn with_page(self, page: Page) -> Self {
        self.push_page(Ok(page));
        self
    }

    pub fn with_feed_error(self, err: FeedError) -> Self {
        self.push_page(Err(err));
        self
    }

    pub fn with_feed_delay(mut self, delay: Duration) -> Self {
        self.feed_delay = delay;
        self
    }

    pub fn with_user(self, user: FeedResult<User>) -> Self {
        *self.user.lock().unwrap() = Some(user);
        self
    }

    pub fn with_resource(self, locator: &str, bytes: &[u8]) -> Self {
        self.resources.lock().unwrap().insert(locator.to_string(), Bytes::copy_from_slice(bytes));
        self
    }

    pub fn with_resource_delay(mut self, locator: &str, delay: Duration) -> Self {
        self.resource_delays.insert(locator.to_string(), delay);
        self
    }

    pub fn push_page(&self, page: FeedResult<Page>) {
        self.pages.lock().unwrap().push_back(page);
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<FeedQuery> { self.queries.lock().unwrap().clone() }

    /// Highest number of concurrently running `fetch_feed` calls observed.
    pub fn max_feed_in_flight(&self) -> usize { self.feed_max_in_flight.load(Ordering::SeqCst) }

    pub fn resource_calls(&self, locator: &str) -> usize {
        self.resource_calls.lock().unwrap().get(locator).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl FeedApi for MockApi {
    async fn fetch_feed(&self, query: FeedQuery) -> FeedResult<Page> {
        let now = self.feed_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.feed_max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        debug!(cursor = ?query.cursor, "mock: fetch_feed");
        if !self.feed_delay.is_zero() {
            tokio::time::sleep(self.feed_delay).await;
        }
        let next = self.pages.lock().unwrap().pop_front();
        self.feed_in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(Page::default()))
    }

    async fn fetch_user(&self) -> FeedResult<User> {
        self.user
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(FeedError::Transport("no user configured".into())))
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for MockApi {
    async fn fetch(&self, locator: &str) -> FeedResult<Bytes> {
        *self.resource_calls.lock().unwrap().entry(locator.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.resource_delays.get(locator) {
            tokio::time::sleep(*delay).await;
        }
        let found = self.resources.lock().unwrap().get(locator).cloned();
        found.ok_or_else(|| FeedError::Transport(format!("404 {}", locator)))
    }
}

/// Measurement oracle returning a fixed raw height per text (or a default),
/// counting how often it is consulted.
pub struct ScriptedMeasure {
    line_height: f32,
    default_height: f32,
    heights: HashMap<String, f32>,
    calls: AtomicUsize,
}

impl ScriptedMeasure {
    pub fn new(line_height: f32, default_height: f32) -> Self {
        Self { line_height, default_height, heights: HashMap::new(), calls: AtomicUsize::new(0) }
    }

    pub fn with_text(mut self, text: &str, height: f32) -> Self {
        self.heights.insert(text.to_string(), height);
        self
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl TextMeasure for ScriptedMeasure {
    fn measure(&self, text: &str, width: f32) -> TextArea {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let height = self.heights.get(text).copied().unwrap_or(self.default_height);
        TextArea { width, height, line_height: self.line_height }
    }
}

/// Feed item fixture: `n` picks the text, source and avatar; `photos` attachments.
pub fn sample_item(n: usize, photos: usize) -> FeedItem {
    let attachments: SmallVec<[Attachment; 4]> = (0..photos)
        .map(|i| Attachment { image_link: format!("https://img.test/{}/{}.jpg", n, i) })
        .collect();
    FeedItem {
        source: Source {
            id: n as i64,
            name: format!("source {}", n),
            image_link: format!("https://img.test/avatar/{}.jpg", n),
        },
        date: 1_541_930_000 + n as i64,
        text: format!("post {}", n),
        attachments,
        likes: n as i64,
        comments: 0,
        reposts: 0,
        views: 1000 * n as i64,
    }
}

/// Page fixture with items numbered `range`.
pub fn sample_page(range: std::ops::Range<usize>, next: Option<&str>) -> Page {
    Page { items: range.map(|n| sample_item(n, 0)).collect(), next_cursor: next.map(str::to_string) }
}
