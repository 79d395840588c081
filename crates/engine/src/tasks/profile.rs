#![forbid(unsafe_code)]

use bytes::Bytes;
use newsfeed_core::{FeedResult, User};
use tracing::{info, warn};

use crate::model::{FeedEvent, Update};
use crate::FeedEngine;

impl FeedEngine {
    /// Fetch the signed-in user's avatar once per session. Later calls are no-ops.
    pub fn load_profile(&mut self) -> bool {
        if self.profile.requested {
            return false;
        }
        self.profile.requested = true;
        let api = self.feed_api.clone();
        let tx = self.updates_tx.clone();
        self.rt.spawn(async move {
            let result = api.fetch_user().await;
            let _ = tx.send(Update::Profile(result));
        });
        true
    }

    pub(crate) fn apply_profile(&mut self, result: FeedResult<User>) {
        let user = match result {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "profile fetch failed");
                self.profile.requested = false;
                return;
            }
        };
        if user.image_link.is_empty() {
            return;
        }
        self.profile.generation += 1;
        let generation = self.profile.generation;
        let tx = self.updates_tx.clone();
        info!(link = %user.image_link, "profile avatar requested");
        self.loader.request(&user.image_link, move |bytes| {
            let _ = tx.send(Update::ProfileImage { generation, bytes });
        });
    }

    pub(crate) fn apply_profile_image(&mut self, generation: u64, bytes: Bytes) {
        if generation != self.profile.generation {
            return self.stale("profile");
        }
        self.profile.image = Some(bytes.clone());
        self.emit(FeedEvent::ProfileImage { bytes });
    }
}
