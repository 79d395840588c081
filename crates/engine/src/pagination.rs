//! Single-flight pagination state machine. Pure: the engine performs the
//! fetch and reports the outcome through `complete`.

use newsfeed_core::{FeedQuery, FeedResult, Page, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchKind {
    Next,
    Refresh,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaginationState {
    Idle,
    Loading(FetchKind),
}

pub struct PaginationController {
    state: PaginationState,
    query: FeedQuery,
    /// Fresh query of an in-flight refresh; committed only on success.
    staged: Option<FeedQuery>,
    window_days: u32,
    exhausted: bool,
    stop_at_exhaustion: bool,
}

impl PaginationController {
    pub fn new(now: Timestamp, window_days: u32, stop_at_exhaustion: bool) -> Self {
        Self {
            state: PaginationState::Idle,
            query: FeedQuery::begin(now, window_days),
            staged: None,
            window_days,
            exhausted: false,
            stop_at_exhaustion,
        }
    }

    pub fn state(&self) -> PaginationState { self.state }
    pub fn query(&self) -> &FeedQuery { &self.query }
    pub fn is_loading(&self) -> bool { matches!(self.state, PaginationState::Loading(_)) }
    /// The last page arrived without a cursor.
    pub fn is_exhausted(&self) -> bool { self.exhausted }

    /// Idle -> Loading(Next). `None` while loading, or once exhausted when so configured.
    pub fn begin_next(&mut self) -> Option<FeedQuery> {
        if self.is_loading() {
            return None;
        }
        if self.exhausted && self.stop_at_exhaustion {
            debug!("feed exhausted; fetch_next suppressed");
            return None;
        }
        self.state = PaginationState::Loading(FetchKind::Next);
        Some(self.query.clone())
    }

    /// Idle -> Loading(Refresh) with no cursor and a window reopened at `now`.
    pub fn begin_refresh(&mut self, now: Timestamp) -> Option<FeedQuery> {
        if self.is_loading() {
            return None;
        }
        let fresh = FeedQuery::begin(now, self.window_days);
        self.staged = Some(fresh.clone());
        self.state = PaginationState::Loading(FetchKind::Refresh);
        Some(fresh)
    }

    /// Loading -> Idle. On success the cursor advances (a refresh also commits its
    /// new window); on failure nothing but the state changes. Returns `None` for a
    /// completion that does not match the fetch in flight.
    pub fn complete(&mut self, kind: FetchKind, result: FeedResult<Page>) -> Option<FeedResult<Page>> {
        if self.state != PaginationState::Loading(kind) {
            debug!(?kind, state = ?self.state, "unexpected page completion dropped");
            return None;
        }
        self.state = PaginationState::Idle;
        let staged = self.staged.take();
        match result {
            Ok(page) => {
                let base = match kind {
                    FetchKind::Next => &self.query,
                    FetchKind::Refresh => staged.as_ref().unwrap_or(&self.query),
                };
                self.query = base.resume(page.next_cursor.clone());
                self.exhausted = page.next_cursor.is_none();
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsfeed_core::FeedError;

    fn page(next: Option<&str>) -> Page { Page { items: Vec::new(), next_cursor: next.map(str::to_string) } }

    #[test]
    fn single_flight() {
        let mut p = PaginationController::new(1_000_000, 365, true);
        assert!(p.begin_next().is_some());
        assert!(p.begin_next().is_none());
        assert!(p.begin_refresh(1_000_001).is_none());
        assert_eq!(p.state(), PaginationState::Loading(FetchKind::Next));
        p.complete(FetchKind::Next, Ok(page(Some("X"))));
        assert_eq!(p.state(), PaginationState::Idle);
    }

    #[test]
    fn cursor_advances_and_is_submitted() {
        let mut p = PaginationController::new(1_000_000, 365, true);
        let first = p.begin_next().unwrap();
        assert!(first.cursor.is_none());
        p.complete(FetchKind::Next, Ok(page(Some("X"))));
        let second = p.begin_next().unwrap();
        assert_eq!(second.cursor.as_deref(), Some("X"));
        assert_eq!(second.window_start, first.window_start);
    }

    #[test]
    fn failure_keeps_cursor() {
        let mut p = PaginationController::new(1_000_000, 365, true);
        p.begin_next();
        p.complete(FetchKind::Next, Ok(page(Some("X"))));
        p.begin_next();
        let out = p.complete(FetchKind::Next, Err(FeedError::Transport("down".into())));
        assert!(matches!(out, Some(Err(_))));
        assert_eq!(p.query().cursor.as_deref(), Some("X"));
        assert_eq!(p.state(), PaginationState::Idle);
    }

    #[test]
    fn refresh_commits_window_only_on_success() {
        let mut p = PaginationController::new(1_000_000, 1, true);
        p.begin_next();
        p.complete(FetchKind::Next, Ok(page(Some("X"))));
        let old_window = p.query().window_start;

        let q = p.begin_refresh(2_000_000).unwrap();
        assert!(q.cursor.is_none());
        p.complete(FetchKind::Refresh, Err(FeedError::Decode("bad".into())));
        assert_eq!(p.query().window_start, old_window);
        assert_eq!(p.query().cursor.as_deref(), Some("X"));

        p.begin_refresh(2_000_000);
        p.complete(FetchKind::Refresh, Ok(page(Some("R"))));
        assert_eq!(p.query().window_start, 2_000_000 - 86_400);
        assert_eq!(p.query().cursor.as_deref(), Some("R"));
    }

    #[test]
    fn exhaustion_policy() {
        let mut stop = PaginationController::new(1_000_000, 365, true);
        stop.begin_next();
        stop.complete(FetchKind::Next, Ok(page(None)));
        assert!(stop.is_exhausted());
        assert!(stop.begin_next().is_none());
        assert!(stop.begin_refresh(1_000_100).is_some());
        stop.complete(FetchKind::Refresh, Ok(page(Some("again"))));
        assert!(!stop.is_exhausted());
        assert!(stop.begin_next().is_some());

        let mut keep = PaginationController::new(1_000_000, 365, false);
        keep.begin_next();
        keep.complete(FetchKind::Next, Ok(page(None)));
        let q = keep.begin_next().unwrap();
        assert!(q.cursor.is_none());
    }

    #[test]
    fn mismatched_completion_is_ignored() {
        let mut p = PaginationController::new(1_000_000, 365, true);
        assert!(p.complete(FetchKind::Next, Ok(page(Some("X")))).is_none());
        assert!(p.query().cursor.is_none());
    }
}
