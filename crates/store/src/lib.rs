//! Newsfeed store: the ordered, append-only collection of card view models.

#![forbid(unsafe_code)]

use std::ops::Range;

use chrono::Local;
use newsfeed_core::FeedItem;
use tracing::debug;

mod card;
mod frame;

pub use card::{CardViewModel, ResourceTarget, Truncation};
pub use frame::{CardFrame, Insets};

/// Cards in arrival order. Pages are appended whole; the only removal is a
/// full `replace`. Card versions come from one store-wide counter so a
/// version is never reused, not even across a replace.
pub struct FeedStore {
    cards: Vec<CardViewModel>,
    line_limit: u32,
    next_version: u64,
    epoch: u64,
}

impl FeedStore {
    pub fn new(line_limit: u32) -> Self { Self { cards: Vec::new(), line_limit, next_version: 0, epoch: 0 } }

    pub fn len(&self) -> usize { self.cards.len() }
    pub fn is_empty(&self) -> bool { self.cards.is_empty() }
    /// Bumped by every `replace`.
    pub fn epoch(&self) -> u64 { self.epoch }

    pub fn get(&self, index: usize) -> Option<&CardViewModel> { self.cards.get(index) }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CardViewModel> { self.cards.get_mut(index) }
    pub fn iter(&self) -> impl Iterator<Item = &CardViewModel> { self.cards.iter() }

    /// Append a page; returns exactly the new index range.
    pub fn append(&mut self, items: Vec<FeedItem>) -> Range<usize> {
        let start = self.cards.len();
        let now = Local::now();
        let limit = self.line_limit;
        self.cards.extend(items.into_iter().map(|it| CardViewModel::with_now(it, limit, &now)));
        debug!(start, added = self.cards.len() - start, "page appended");
        start..self.cards.len()
    }

    /// Drop everything and start over with `items`. Returns the new length.
    pub fn replace(&mut self, items: Vec<FeedItem>) -> usize {
        self.cards.clear();
        self.epoch += 1;
        self.append(items);
        self.cards.len()
    }

    /// Invalidate pending deliveries for the card at `index`; returns its new version.
    pub fn invalidate(&mut self, index: usize) -> Option<u64> {
        let card = self.cards.get_mut(index)?;
        self.next_version += 1;
        card.invalidate(self.next_version);
        Some(self.next_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsfeed_api::sample_page;

    #[test]
    fn versions_never_repeat_across_replace() {
        let mut s = FeedStore::new(6);
        s.append(sample_page(0..2, None).items);
        let before = s.invalidate(0).unwrap();
        s.replace(sample_page(10..12, None).items);
        let after = s.invalidate(0).unwrap();
        assert!(after > before);
        assert_eq!(s.epoch(), 1);
    }

    #[test]
    fn invalidate_out_of_range() {
        let mut s = FeedStore::new(6);
        assert!(s.invalidate(0).is_none());
    }
}
