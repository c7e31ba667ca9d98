//! # Digest
//! Pure formatting of one run's new items into a single mail. No I/O.
//!
//! Entries are ordered by `(entity, timestamp)` and grouped under one
//! `=== entity ===` header per company.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::ingest::types::ClassifiedItem;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub entity: String,
    pub timestamp: String, // TIMESTAMP_FORMAT in the target zone
    pub title: String,
    pub link: String,
}

impl DigestEntry {
    pub fn from_item(entity: &str, c: &ClassifiedItem) -> Self {
        Self {
            entity: entity.to_string(),
            timestamp: c.published.format(TIMESTAMP_FORMAT).to_string(),
            title: c.item.title.clone(),
            link: c.item.link.clone(),
        }
    }
}

/// Subject + plain-text body handed to the notification sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestMessage {
    pub subject: String,
    pub body: String,
}

/// Time frame printed in the digest header.
#[derive(Debug, Clone)]
pub struct DigestWindow<'a> {
    pub since: DateTime<FixedOffset>,
    pub now: DateTime<FixedOffset>,
    pub lookback_hours: i64,
    pub zone_label: &'a str,
}

pub fn subject_line(lookback_hours: i64, count: usize) -> String {
    format!("【人事ニュース】直近{lookback_hours}h 新規{count}件")
}

/// `None` when there is nothing new; the caller then skips notification.
pub fn build_digest(entries: &[DigestEntry], window: &DigestWindow<'_>) -> Option<DigestMessage> {
    if entries.is_empty() {
        return None;
    }

    let mut sorted: Vec<&DigestEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.entity
            .cmp(&b.entity)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let mut lines = vec![
        format!("【人事ニュース｜直近{}時間（新規）】", window.lookback_hours),
        format!(
            "対象期間: {} ～ {}（{}）",
            window.since.format(TIMESTAMP_FORMAT),
            window.now.format(TIMESTAMP_FORMAT),
            window.zone_label
        ),
        format!("新規: {}件", sorted.len()),
        String::new(),
    ];

    let mut current: Option<&str> = None;
    for e in sorted {
        if current != Some(e.entity.as_str()) {
            current = Some(e.entity.as_str());
            lines.push(format!("\n=== {} ===", e.entity));
        }
        lines.push(format!("- [{}] {}", e.timestamp, e.title));
        lines.push(format!("  {}", e.link));
    }

    Some(DigestMessage {
        subject: subject_line(window.lookback_hours, entries.len()),
        body: lines.join("\n"),
    })
}
