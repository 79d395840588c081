#![forbid(unsafe_code)]

use tracing::trace;

use crate::model::Update;
use crate::slots::SlotId;
use crate::FeedEngine;

impl FeedEngine {
    /// Request every image of the card at `index` on behalf of `slot`. Each
    /// delivery carries the slot generation and card version it was issued for.
    pub(crate) fn request_card_resources(&self, slot: SlotId, generation: u64, index: usize, version: u64) {
        let Some(card) = self.store.get(index) else { return };
        for (target, locator) in card.resources() {
            if locator.is_empty() {
                continue;
            }
            trace!(?slot, index, ?target, "resource requested");
            let tx = self.updates_tx.clone();
            self.loader.request(locator, move |bytes| {
                let _ = tx.send(Update::Resource { slot, generation, index, version, target, bytes });
            });
        }
    }
}
