#![forbid(unsafe_code)]

use std::time::Instant;

use metrics::{counter, histogram};
use newsfeed_core::{now_ts, FeedQuery};
use tracing::{debug, info};

use crate::model::Update;
use crate::pagination::FetchKind;
use crate::FeedEngine;

impl FeedEngine {
    /// Ask for the page after the current cursor. Returns false when a fetch is
    /// already in flight or the feed is exhausted.
    pub fn fetch_next(&mut self) -> bool {
        match self.pagination.begin_next() {
            Some(query) => {
                self.start_page_task(FetchKind::Next, query);
                true
            }
            None => false,
        }
    }

    /// Start over from the newest items. The current feed stays visible until
    /// the first page of the new session arrives.
    pub fn refresh(&mut self) -> bool {
        match self.pagination.begin_refresh(now_ts()) {
            Some(query) => {
                self.start_page_task(FetchKind::Refresh, query);
                true
            }
            None => {
                debug!("refresh ignored while a fetch is in flight");
                false
            }
        }
    }

    fn start_page_task(&mut self, kind: FetchKind, query: FeedQuery) {
        info!(?kind, cursor = ?query.cursor, window_start = query.window_start, "page fetch started");
        counter!("feed_page_fetch_total", 1u64);
        let api = self.feed_api.clone();
        let tx = self.updates_tx.clone();
        self.feed_task = Some(self.rt.spawn(async move {
            let started = Instant::now();
            let result = api.fetch_feed(query).await;
            histogram!("feed_page_fetch_ms", started.elapsed().as_secs_f64() * 1000.0);
            let _ = tx.send(Update::Page { kind, result });
        }));
    }
}
