#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use newsfeed_api::{MockApi, ScriptedMeasure};
use newsfeed_engine::{Collaborators, EngineConfig, FeedEngine, FeedEvent};
use tokio::runtime::Handle;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine_with(
    api: Arc<MockApi>,
    measure: Arc<ScriptedMeasure>,
    config: EngineConfig,
) -> (FeedEngine, Receiver<FeedEvent>) {
    init_tracing();
    let collab = Collaborators { feed: api.clone(), resources: api, measure, persistent: None };
    FeedEngine::new(collab, config, Handle::current())
}

pub fn engine(api: Arc<MockApi>) -> (FeedEngine, Receiver<FeedEvent>) {
    engine_with(api, Arc::new(ScriptedMeasure::new(18.0, 18.0)), EngineConfig::default())
}

/// Pump until an event satisfies `done`; returns every event seen on the way.
pub async fn pump_until(
    engine: &mut FeedEngine,
    events: &Receiver<FeedEvent>,
    mut done: impl FnMut(&FeedEvent) -> bool,
) -> Vec<FeedEvent> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut seen = Vec::new();
    loop {
        engine.pump();
        while let Ok(ev) = events.try_recv() {
            let hit = done(&ev);
            seen.push(ev);
            if hit {
                return seen;
            }
        }
        assert!(Instant::now() < deadline, "timed out waiting; saw {:?}", seen);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Keep pumping for `period` and collect whatever arrives.
pub async fn settle(engine: &mut FeedEngine, events: &Receiver<FeedEvent>, period: Duration) -> Vec<FeedEvent> {
    let deadline = Instant::now() + period;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        engine.pump();
        seen.extend(events.try_iter());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    engine.pump();
    seen.extend(events.try_iter());
    seen
}

pub fn is_inserted(ev: &FeedEvent) -> bool { matches!(ev, FeedEvent::PageInserted { .. }) }
