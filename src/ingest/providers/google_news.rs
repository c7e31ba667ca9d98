// src/ingest/providers/google_news.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{FeedItem, FeedSource};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Google News RSS search feed.
pub struct GoogleNewsSource {
    mode: Mode,
}

enum Mode {
    // Fixed document returned for every URL; used by tests and offline runs.
    Fixture(String),
    Http { client: reqwest::Client },
}

impl GoogleNewsSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn http() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    /// Parse an RSS 2.0 body and keep the first `limit` items.
    pub fn parse_items_from_str(s: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let rss: Rss = from_str(s).context("parsing google news rss xml")?;

        let items: Vec<FeedItem> = rss
            .channel
            .item
            .into_iter()
            .take(limit)
            .map(|it| FeedItem {
                title: trimmed(it.title),
                link: trimmed(it.link),
                pub_date: trimmed(it.pub_date),
                description: trimmed(it.description),
            })
            .collect();

        counter!("digest_items_fetched_total").increment(items.len() as u64);
        Ok(items)
    }
}

// Text is kept as delivered (XML-unescaped, trimmed); the classifier sees exactly this.
fn trimmed(field: Option<String>) -> String {
    field.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[async_trait]
impl FeedSource for GoogleNewsSource {
    async fn fetch(&self, url: &str, limit: usize) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, limit),
            Mode::Http { client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .context("feed http get()")?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                Self::parse_items_from_str(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "GoogleNews"
    }
}
