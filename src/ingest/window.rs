// src/ingest/window.rs
//! Publish-time parsing and the lookback window.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};

use crate::ingest::types::{ClassifiedItem, FeedItem};

/// Longest accepted lookback (100 years); larger values are clamped.
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 365 * 100;

// RFC 2822 shapes without a zone; read as UTC.
const ZONELESS_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M",
];

/// Parse an RFC 2822 date. A missing zone means UTC. `None` if unparseable.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    ZONELESS_FORMATS.iter().find_map(|f| {
        NaiveDateTime::parse_from_str(raw, f)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Parse and convert into the target zone.
pub fn normalize_pub_date(raw: &str, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    parse_pub_date(raw).map(|dt| dt.with_timezone(zone))
}

/// Start of the window: `now - lookback_hours`, with the lookback clamped to
/// `0..=MAX_LOOKBACK_HOURS`.
pub fn window_start(now: DateTime<FixedOffset>, lookback_hours: i64) -> DateTime<FixedOffset> {
    let hours = lookback_hours.clamp(0, MAX_LOOKBACK_HOURS);
    now - Duration::hours(hours)
}

/// Keep items published at or after `now - lookback`, newest first.
///
/// Items whose date cannot be parsed are dropped without error.
pub fn filter_window(
    items: Vec<FeedItem>,
    now: DateTime<FixedOffset>,
    lookback_hours: i64,
) -> Vec<ClassifiedItem> {
    let since = window_start(now, lookback_hours);
    let zone = *now.offset();

    let mut kept: Vec<ClassifiedItem> = items
        .into_iter()
        .filter_map(|item| {
            let published = normalize_pub_date(&item.pub_date, &zone)?;
            (published >= since).then_some(ClassifiedItem { item, published })
        })
        .collect();

    kept.sort_by(|a, b| b.published.cmp(&a.published));
    kept
}
