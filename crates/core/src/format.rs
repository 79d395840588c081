//! Display formatting for card fields.

use chrono::{DateTime, TimeZone};

use crate::Timestamp;

const SCALES: [(i64, &str); 3] = [(1_000_000_000, "G"), (1_000_000, "M"), (1_000, "K")];

/// Compact counter: verbatim below 1000, otherwise one fractional digit rounded down
/// with a K/M/G suffix ("1.2K", "3M").
pub fn format_counter(value: i64) -> String {
    let Some((scale, suffix)) = SCALES.iter().find(|(s, _)| value >= *s) else {
        return value.to_string();
    };
    let tenths = value / (scale / 10);
    if tenths % 10 == 0 {
        format!("{}{}", tenths / 10, suffix)
    } else {
        format!("{}.{}{}", tenths / 10, tenths % 10, suffix)
    }
}

/// Post date relative to `now`: "Today at 14:05", "Yesterday at 09:30",
/// otherwise "3 Nov 2018 at 14:05". Rendered in `now`'s timezone.
pub fn format_date<Tz: TimeZone>(ts: Timestamp, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(utc) = DateTime::<chrono::Utc>::from_timestamp(ts, 0) else {
        return String::new();
    };
    let local = utc.with_timezone(&now.timezone());
    let day = local.date_naive();
    let today = now.date_naive();
    let time = local.format("%H:%M");
    if day == today {
        format!("Today at {}", time)
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday at {}", time)
    } else {
        format!("{} at {}", local.format("%-d %b %Y"), time)
    }
}
