// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod digest;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod relevance;

// ---- Re-exports for stable public API ----
pub use crate::config::{Settings, TrackedEntity, Watchlist};
pub use crate::dedup::{FileSeenStore, MemorySeenStore, SeenStore};
pub use crate::digest::{DigestEntry, DigestMessage};
pub use crate::ingest::types::{FeedItem, FeedSource};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::pipeline::{EntityOutcome, FailureStage, Pipeline, RunOptions, RunReport};

use anyhow::Result;
use ingest::providers::google_news::GoogleNewsSource;

/// Production wiring: Google News over HTTP, file-backed store, env-configured sinks.
///
/// Only an HTTP client build failure is returned; everything else is logged in the report.
pub async fn run_from_settings(settings: &Settings) -> Result<RunReport> {
    let watchlist = Watchlist::load_or_seed(&settings.watchlist_path);
    let pipeline = Pipeline::new(watchlist, RunOptions::from_settings(settings));

    let source = GoogleNewsSource::http()?;
    let store = FileSeenStore::new(&settings.seen_file).with_max_seen(settings.max_seen);
    let notifier = NotifierMux::from_settings(&settings.mail);

    let now = settings.zone.now();
    Ok(pipeline.run_once(&source, &store, &notifier, now).await)
}
