//! Newsfeed engine: the control-thread side of the feed.
//!
//! `FeedEngine` owns every piece of mutable feed state. Fetches run on the tokio
//! runtime and report back through an update queue; nothing they produce is
//! applied until the owner calls [`FeedEngine::pump`] on the control thread.
//! Consumers observe changes through the [`FeedEvent`] channel returned by
//! [`FeedEngine::new`].

#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc};

use bytes::Bytes;
use metrics::counter;
use newsfeed_api::{FeedApi, ResourceFetcher, TextMeasure};
use newsfeed_cache::{LoadCoordinator, ResourceCache};
use newsfeed_core::now_ts;
use newsfeed_persist::BlobStore;
use newsfeed_store::{CardViewModel, FeedStore};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

mod config;
mod model;
mod pagination;
mod slots;
mod tasks;

pub use config::EngineConfig;
pub use model::FeedEvent;
pub use newsfeed_store::{CardFrame, ResourceTarget, Truncation};
pub use pagination::{FetchKind, PaginationController, PaginationState};
pub use slots::{SlotId, SlotTable};

use model::{ProfileState, Update};

/// Everything the engine does not implement itself.
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn FeedApi>,
    pub resources: Arc<dyn ResourceFetcher>,
    pub measure: Arc<dyn TextMeasure>,
    pub persistent: Option<Arc<dyn BlobStore>>,
}

/// What a slot currently displays.
pub struct SlotView<'a> {
    pub index: usize,
    pub card: &'a CardViewModel,
}

pub struct FeedEngine {
    feed_api: Arc<dyn FeedApi>,
    measure: Arc<dyn TextMeasure>,
    loader: LoadCoordinator,
    store: FeedStore,
    pagination: PaginationController,
    slots: SlotTable,
    config: EngineConfig,
    rt: Handle,
    updates_tx: mpsc::Sender<Update>,
    updates_rx: mpsc::Receiver<Update>,
    events: mpsc::Sender<FeedEvent>,
    profile: ProfileState,
    feed_task: Option<JoinHandle<()>>,
}

impl FeedEngine {
    pub fn new(collab: Collaborators, config: EngineConfig, rt: Handle) -> (Self, mpsc::Receiver<FeedEvent>) {
        info!(line_limit = config.line_limit, memory_cap = config.memory_capacity, "feed engine starting");
        let cache = ResourceCache::new(config.memory_capacity, collab.persistent.clone(), rt.clone());
        cache.trim_persistent(config.persist_capacity);
        let loader = LoadCoordinator::new(cache, collab.resources, rt.clone());
        let (updates_tx, updates_rx) = mpsc::channel::<Update>();
        let (events, events_rx) = mpsc::channel::<FeedEvent>();
        let this = Self {
            feed_api: collab.feed,
            measure: collab.measure,
            loader,
            store: FeedStore::new(config.line_limit),
            pagination: PaginationController::new(now_ts(), config.window_days, config.stop_at_exhaustion),
            slots: SlotTable::new(),
            config,
            rt,
            updates_tx,
            updates_rx,
            events,
            profile: ProfileState::default(),
            feed_task: None,
        };
        (this, events_rx)
    }

    pub fn len(&self) -> usize { self.store.len() }
    pub fn is_empty(&self) -> bool { self.store.is_empty() }
    pub fn card(&self, index: usize) -> Option<&CardViewModel> { self.store.get(index) }
    pub fn pagination(&self) -> &PaginationController { &self.pagination }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn profile_image(&self) -> Option<&Bytes> { self.profile.image.as_ref() }
    pub fn loader(&self) -> &LoadCoordinator { &self.loader }

    /// Apply every queued background result. Call from the control thread.
    /// Returns how many results were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates_rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Page { kind, result } => self.apply_page(kind, result),
            Update::Resource { slot, generation, index, version, target, bytes } => {
                self.apply_resource(slot, generation, index, version, target, bytes)
            }
            Update::Profile(result) => self.apply_profile(result),
            Update::ProfileImage { generation, bytes } => self.apply_profile_image(generation, bytes),
        }
    }

    fn emit(&self, event: FeedEvent) {
        let _ = self.events.send(event);
    }

    /// Card height at `available_width`; measures on first use.
    pub fn height(&mut self, index: usize, available_width: f32) -> Option<f32> {
        let frame = self.config.frame;
        let card = self.store.get_mut(index)?;
        Some(card.height(available_width, &frame, self.measure.as_ref()))
    }

    /// Expand a collapsed card; emits `CardHeightChanged` when something changed.
    pub fn expand(&mut self, index: usize) -> bool {
        let changed = self.store.get_mut(index).map(|c| c.expand()).unwrap_or(false);
        if changed {
            debug!(index, "card expanded");
            self.emit(FeedEvent::CardHeightChanged { index });
        }
        changed
    }

    pub fn acquire_slot(&mut self) -> SlotId { self.slots.acquire() }

    /// Show card `index` in `slot`. Everything pending for the slot's previous
    /// content is invalidated before the new resources are requested.
    pub fn bind(&mut self, slot: SlotId, index: usize) -> bool {
        if index >= self.store.len() {
            return false;
        }
        let Some((generation, previous)) = self.slots.rebind(slot, Some(index)) else {
            return false;
        };
        if let Some(prev) = previous.filter(|&prev| prev != index) {
            self.leave_card(prev, slot);
        }
        let Some(version) = self.store.invalidate(index) else { return false };
        self.request_card_resources(slot, generation, index, version);
        self.maybe_prefetch(index);
        true
    }

    /// Stop displaying anything in `slot` and return it to the pool.
    pub fn release(&mut self, slot: SlotId) {
        if let Some(prev) = self.slots.release(slot) {
            self.leave_card(prev, slot);
        }
    }

    /// `slot` no longer shows card `index`. Its pending deliveries are voided;
    /// if another slot still shows the card, that slot asks again under the
    /// card's new version (answered by the in-flight load or the cache).
    fn leave_card(&mut self, index: usize, slot: SlotId) {
        let Some(version) = self.store.invalidate(index) else { return };
        if let Some((holder, generation)) = self.slots.holder_of(index, slot) {
            debug!(index, ?holder, "card still shown; re-requesting resources");
            self.request_card_resources(holder, generation, index, version);
        }
    }

    pub fn slot_view(&self, slot: SlotId) -> Option<SlotView<'_>> {
        let index = self.slots.bound(slot)?;
        let card = self.store.get(index)?;
        Some(SlotView { index, card })
    }

    fn maybe_prefetch(&mut self, index: usize) {
        if self.store.len() - index < self.config.prefetch_distance {
            self.fetch_next();
        }
    }

    fn stale(&self, what: &'static str) {
        counter!("resource_stale_drop_total", 1u64);
        debug!(what, "stale delivery dropped");
    }

    fn apply_resource(
        &mut self,
        slot: SlotId,
        generation: u64,
        index: usize,
        version: u64,
        target: ResourceTarget,
        bytes: Bytes,
    ) {
        if !self.slots.is_current(slot, generation) {
            return self.stale("slot");
        }
        let delivered = self.store.get_mut(index).map(|c| c.deliver(version, target, bytes)).unwrap_or(false);
        if !delivered {
            return self.stale("card");
        }
        self.emit(FeedEvent::SlotResourceReady { slot, index, target });
    }

    fn apply_page(&mut self, kind: FetchKind, result: newsfeed_core::FeedResult<newsfeed_core::Page>) {
        self.feed_task = None;
        let Some(result) = self.pagination.complete(kind, result) else { return };
        match (kind, result) {
            (FetchKind::Next, Ok(page)) => {
                let range = self.store.append(page.items);
                info!(start = range.start, items = range.len(), cursor = ?page.next_cursor, "page inserted");
                self.emit(FeedEvent::PageInserted { range });
            }
            (FetchKind::Refresh, Ok(page)) => {
                let unbound = self.slots.unbind_all();
                let len = self.store.replace(page.items);
                info!(items = len, unbound, cursor = ?page.next_cursor, "feed reloaded");
                self.emit(FeedEvent::Reloaded { len });
            }
            (kind, Err(error)) => {
                counter!("feed_page_fetch_errors_total", 1u64);
                let initial = self.store.is_empty();
                warn!(?kind, initial, error = %error, "page fetch failed");
                self.emit(FeedEvent::PaginationFailed { kind, initial, error });
            }
        }
    }
}

impl Drop for FeedEngine {
    fn drop(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
    }
}
