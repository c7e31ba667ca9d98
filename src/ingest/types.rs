// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, FixedOffset};

/// One `<item>` from a feed. Missing sub-fields are empty strings, never absent.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,     // unique id across runs
    pub pub_date: String, // raw RFC 2822 text, unparsed
    pub description: String,
}

impl FeedItem {
    /// Text the relevance classifier looks at.
    pub fn classify_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// A feed item that survived the time window, with its timestamp in the target zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedItem {
    pub item: FeedItem,
    pub published: DateTime<FixedOffset>,
}

#[async_trait::async_trait]
pub trait FeedSource {
    /// Fetch at most `limit` items for a fully formed request URL.
    async fn fetch(&self, url: &str, limit: usize) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &'static str;
}
