use std::str::FromStr;

use newsfeed_store::CardFrame;
use serde::{Deserialize, Serialize};

/// Engine tunables. `from_env` overrides defaults from `NEWSFEED_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Text longer than this many lines starts collapsed.
    pub line_limit: u32,
    /// Binding a card closer than this to the end asks for the next page.
    pub prefetch_distance: usize,
    /// How far back a pagination session's window reaches.
    pub window_days: u32,
    pub memory_capacity: usize,
    pub persist_capacity: usize,
    /// Stop issuing `fetch_next` once a page arrives without a cursor.
    pub stop_at_exhaustion: bool,
    pub frame: CardFrame,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            line_limit: 6,
            prefetch_distance: 5,
            window_days: 365,
            memory_capacity: 256,
            persist_capacity: 2048,
            stop_at_exhaustion: true,
            frame: CardFrame::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let num = |k: &str| lookup(k).and_then(|s| parse::<usize>(&s));
        Self {
            line_limit: lookup("NEWSFEED_LINE_LIMIT").and_then(|s| parse(&s)).unwrap_or(d.line_limit),
            prefetch_distance: num("NEWSFEED_PREFETCH_DISTANCE").unwrap_or(d.prefetch_distance),
            window_days: lookup("NEWSFEED_WINDOW_DAYS").and_then(|s| parse(&s)).unwrap_or(d.window_days),
            memory_capacity: num("NEWSFEED_MEMORY_CAP").unwrap_or(d.memory_capacity),
            persist_capacity: num("NEWSFEED_PERSIST_CAP").unwrap_or(d.persist_capacity),
            stop_at_exhaustion: lookup("NEWSFEED_STOP_AT_EXHAUSTION")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(d.stop_at_exhaustion),
            frame: d.frame,
        }
    }
}

fn parse<T: FromStr>(s: &str) -> Option<T> { s.trim().parse::<T>().ok() }

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_and_garbage() {
        let env: HashMap<&str, &str> = [
            ("NEWSFEED_LINE_LIMIT", "4"),
            ("NEWSFEED_PREFETCH_DISTANCE", "not-a-number"),
            ("NEWSFEED_STOP_AT_EXHAUSTION", "false"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.line_limit, 4);
        assert_eq!(cfg.prefetch_distance, 5);
        assert!(!cfg.stop_at_exhaustion);
        assert_eq!(cfg.window_days, 365);
    }
}
