use bytes::Bytes;
use chrono::{DateTime, Local, TimeZone};
use newsfeed_api::TextMeasure;
use newsfeed_core::format::{format_counter, format_date};
use newsfeed_core::{FeedItem, TextArea};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::CardFrame;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Truncation {
    Collapsed,
    Expanded,
}

/// Which resource of a card a delivery fills.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceTarget {
    Avatar,
    Media(usize),
}

/// Per-item derived state. Layout is measured once, on the first `height` call.
///
/// `version` guards asynchronous deliveries: a delivery captured at version `v`
/// only lands while the card is still at `v`.
#[derive(Debug)]
pub struct CardViewModel {
    item: FeedItem,
    date: String,
    likes: String,
    comments: String,
    reposts: String,
    views: String,
    line_limit: u32,
    measurement: Option<TextArea>,
    truncatable: bool,
    truncation: Truncation,
    text_height: f32,
    version: u64,
    avatar: Option<Bytes>,
    media: Vec<Option<Bytes>>,
}

impl CardViewModel {
    pub fn new(item: FeedItem, line_limit: u32) -> Self { Self::with_now(item, line_limit, &Local::now()) }

    pub fn with_now<Tz: TimeZone>(item: FeedItem, line_limit: u32, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let media = vec![None; item.attachments.len()];
        Self {
            date: format_date(item.date, now),
            likes: format_counter(item.likes),
            comments: format_counter(item.comments),
            reposts: format_counter(item.reposts),
            views: format_counter(item.views),
            item,
            line_limit,
            measurement: None,
            truncatable: false,
            truncation: Truncation::Collapsed,
            text_height: 0.0,
            version: 0,
            avatar: None,
            media,
        }
    }

    pub fn item(&self) -> &FeedItem { &self.item }
    pub fn date(&self) -> &str { &self.date }
    pub fn likes(&self) -> &str { &self.likes }
    pub fn comments(&self) -> &str { &self.comments }
    pub fn reposts(&self) -> &str { &self.reposts }
    pub fn views(&self) -> &str { &self.views }

    pub fn truncation(&self) -> Truncation { self.truncation }
    pub fn is_measured(&self) -> bool { self.measurement.is_some() }
    pub fn text_height(&self) -> f32 { self.text_height }

    /// Card height at `available_width`. The text is measured on the first call
    /// only; later calls reuse that measurement whatever the width.
    pub fn height(&mut self, available_width: f32, frame: &CardFrame, measure: &dyn TextMeasure) -> f32 {
        if self.measurement.is_none() {
            let area = measure.measure(&self.item.text, frame.text_width(available_width));
            self.apply_measurement(area);
        }
        let affordance = if self.truncatable { frame.affordance_height } else { 0.0 };
        frame.chrome_height() + self.text_height + affordance + frame.media_height(self.item.attachments.len())
    }

    fn apply_measurement(&mut self, area: TextArea) {
        let lines = if area.line_height > 0.0 { (area.height / area.line_height).ceil() } else { 0.0 };
        if lines > self.line_limit as f32 {
            self.truncatable = true;
            self.truncation = Truncation::Collapsed;
            self.text_height = self.line_limit as f32 * area.line_height;
        } else {
            self.truncatable = false;
            self.truncation = Truncation::Expanded;
            self.text_height = area.height;
        }
        debug!(lines, state = ?self.truncation, "card measured");
        self.measurement = Some(area);
    }

    /// Collapsed -> Expanded with the full measured text height. Returns false
    /// (and changes nothing) when already expanded or not yet measured.
    pub fn expand(&mut self) -> bool {
        let Some(area) = self.measurement else { return false };
        if self.truncation != Truncation::Collapsed {
            return false;
        }
        self.truncation = Truncation::Expanded;
        self.text_height = area.height;
        true
    }

    pub fn version(&self) -> u64 { self.version }

    /// Move to `next` (must exceed the current version) and drop delivered
    /// resources; deliveries captured before this call no longer apply.
    pub fn invalidate(&mut self, next: u64) {
        debug_assert!(next > self.version);
        self.version = next;
        self.avatar = None;
        self.media.iter_mut().for_each(|m| *m = None);
    }

    /// Apply a delivery captured at `version`. Stale or out-of-range deliveries
    /// are ignored; returns whether anything changed.
    pub fn deliver(&mut self, version: u64, target: ResourceTarget, bytes: Bytes) -> bool {
        if version != self.version {
            return false;
        }
        match target {
            ResourceTarget::Avatar => self.avatar = Some(bytes),
            ResourceTarget::Media(i) => match self.media.get_mut(i) {
                Some(slot) => *slot = Some(bytes),
                None => return false,
            },
        }
        true
    }

    pub fn avatar(&self) -> Option<&Bytes> { self.avatar.as_ref() }

    pub fn media(&self) -> &[Option<Bytes>] { &self.media }

    /// Every resource this card displays, avatar first.
    pub fn resources(&self) -> Vec<(ResourceTarget, &str)> {
        let mut out = Vec::with_capacity(1 + self.item.attachments.len());
        out.push((ResourceTarget::Avatar, self.item.source.image_link.as_str()));
        for (i, a) in self.item.attachments.iter().enumerate() {
            out.push((ResourceTarget::Media(i), a.image_link.as_str()));
        }
        out
    }
}
