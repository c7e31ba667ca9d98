// tests/pipeline_run.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::sync::Mutex;

use hr_news_digest::config::{KeywordSets, TrackedEntity, Watchlist};
use hr_news_digest::ingest::providers::google_news::GoogleNewsSource;
use hr_news_digest::{
    DigestMessage, EntityOutcome, FailureStage, FeedItem, FeedSource, FileSeenStore,
    MemorySeenStore, Notifier, NotifierMux, Pipeline, RunOptions, SeenStore,
};

const ACME_XML: &str = include_str!("fixtures/google_news_rss.xml");

/// Serves the fixture for every URL, except URLs containing `fail_on`.
struct ScriptedSource {
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            fail_on: None,
            calls: Mutex::new(vec![]),
        }
    }

    fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_on: Some(needle),
            calls: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str, limit: usize) -> Result<Vec<FeedItem>> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(needle) = self.fail_on {
            if url.contains(needle) {
                bail!("connection timed out");
            }
        }
        GoogleNewsSource::parse_items_from_str(ACME_XML, limit)
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}

/// Keeps every digest it is handed; optionally fails after recording.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<DigestMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<DigestMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        if self.fail {
            bail!("smtp relay refused connection");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn now_jst() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 1, 10, 12, 0, 0)
        .unwrap()
}

fn watchlist(entities: Vec<TrackedEntity>) -> Watchlist {
    Watchlist {
        feed: Default::default(),
        keywords: KeywordSets::default(),
        entities,
    }
}

fn acme() -> TrackedEntity {
    TrackedEntity::new("Acme", vec!["Acme".into(), "ACME Corp".into()])
}

#[tokio::test]
async fn new_item_lands_in_digest_and_store() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let source = ScriptedSource::new();
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::new();

    let report = pipeline.run_once(&source, &store, &notifier, now_jst()).await;

    assert_eq!(
        report.entities[0].outcome,
        EntityOutcome::Completed {
            fetched: 7,
            in_window: 5,
            relevant: 3,
            new: 2,
        }
    );
    let links: Vec<_> = report.entries.iter().map(|e| e.link.as_str()).collect();
    assert_eq!(links, vec!["https://x/1", "https://x/7"]);
    assert!(report.persisted);
    assert!(report.notified);

    let seen = store.snapshot();
    assert!(seen.contains("https://x/1"));
    assert!(seen.contains("https://x/7"));
    assert!(!seen.contains("https://x/2"), "noise-vetoed item must not be stored");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "【人事ニュース】直近24h 新規2件");
    assert!(sent[0].body.contains("=== Acme ==="));
    assert!(sent[0].body.contains("- [2025-01-10 10:00] Acme Corp appoints new CEO - Example Wire"));
    assert!(sent[0].body.contains("  https://x/1"));
    // boundary item sorts first within the group
    let pos7 = sent[0].body.find("https://x/7").unwrap();
    let pos1 = sent[0].body.find("https://x/1").unwrap();
    assert!(pos7 < pos1);
}

#[tokio::test]
async fn second_run_is_idempotent_and_silent() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let source = ScriptedSource::new();
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::new();

    let first = pipeline.run_once(&source, &store, &notifier, now_jst()).await;
    assert_eq!(first.new_count(), 2);

    let second = pipeline.run_once(&source, &store, &notifier, now_jst()).await;
    assert_eq!(second.new_count(), 0);
    assert!(!second.persisted);
    assert!(!second.notified);
    assert_eq!(notifier.sent().len(), 1, "no dispatch on the second run");
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn failing_entity_does_not_block_others() {
    let pipeline = Pipeline::new(
        watchlist(vec![
            TrackedEntity::named("Broken"),
            TrackedEntity::new("Ghost", vec![]),
            acme(),
        ]),
        RunOptions::default(),
    );
    let source = ScriptedSource::failing_on("Broken");
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::new();

    let report = pipeline.run_once(&source, &store, &notifier, now_jst()).await;

    assert!(matches!(
        &report.entities[0].outcome,
        EntityOutcome::Failed { stage: FailureStage::Fetch, reason } if reason.contains("timed out")
    ));
    assert!(matches!(
        report.entities[1].outcome,
        EntityOutcome::Failed {
            stage: FailureStage::Config,
            ..
        }
    ));
    assert!(matches!(
        report.entities[2].outcome,
        EntityOutcome::Completed { new: 2, .. }
    ));
    assert_eq!(report.failures().count(), 2);
    // the config error never reaches the network
    assert_eq!(source.calls.lock().unwrap().len(), 2);

    assert!(report.persisted);
    assert_eq!(notifier.sent().len(), 1);
    assert!(!notifier.sent()[0].body.contains("Broken"));
}

#[tokio::test]
async fn same_link_under_two_entities_is_reported_once() {
    let pipeline = Pipeline::new(
        watchlist(vec![acme(), TrackedEntity::named("Acme Holdings")]),
        RunOptions::default(),
    );
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::new();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    assert!(matches!(report.entities[0].outcome, EntityOutcome::Completed { new: 2, .. }));
    assert!(matches!(report.entities[1].outcome, EntityOutcome::Completed { new: 0, .. }));
    assert!(report.entries.iter().all(|e| e.entity == "Acme"));
}

#[tokio::test]
async fn already_seen_links_are_skipped() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let store = MemorySeenStore::with_links(2000, ["https://x/1"]);
    let notifier = RecordingNotifier::new();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    let links: Vec<_> = report.entries.iter().map(|e| e.link.as_str()).collect();
    assert_eq!(links, vec!["https://x/7"]);
    assert_eq!(report.seen_before, 1);
    assert_eq!(report.seen_total, 2);
}

#[tokio::test]
async fn notification_failure_keeps_store_committed() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::failing();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    assert!(report.persisted);
    assert!(!report.notified);
    assert_eq!(notifier.sent().len(), 1);
    assert!(store.snapshot().contains("https://x/1"));
}

#[tokio::test]
async fn mux_with_only_failing_sinks_is_not_notified() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let store = MemorySeenStore::new(2000);
    let mux = NotifierMux::new(vec![
        Box::new(RecordingNotifier::failing()),
        Box::new(RecordingNotifier::failing()),
    ]);

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &mux, now_jst())
        .await;

    assert_eq!(report.new_count(), 2);
    assert!(report.persisted);
    assert!(!report.notified);
}

#[tokio::test]
async fn mux_without_sinks_is_not_notified() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let store = MemorySeenStore::new(2000);
    let mux = NotifierMux::new(vec![]);

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &mux, now_jst())
        .await;

    assert!(report.persisted);
    assert!(!report.notified);
    assert!(store.snapshot().contains("https://x/7"));
}

#[tokio::test]
async fn narrow_window_excludes_everything() {
    let opts = RunOptions {
        lookback_hours: 1,
        ..RunOptions::default()
    };
    let pipeline = Pipeline::new(watchlist(vec![acme()]), opts);
    let store = MemorySeenStore::new(2000);
    let notifier = RecordingNotifier::new();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    assert_eq!(report.new_count(), 0);
    assert!(notifier.sent().is_empty());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn store_bound_holds_after_write() {
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let store = MemorySeenStore::with_links(3, ["https://a/1", "https://a/2", "https://a/3"]);
    let notifier = RecordingNotifier::new();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    assert_eq!(report.new_count(), 2);
    let seen = store.snapshot();
    assert_eq!(seen.len(), 3);
    // lexicographically last three survive
    assert!(seen.contains("https://x/1"));
    assert!(seen.contains("https://x/7"));
    assert!(seen.contains("https://a/3"));
}

#[tokio::test]
async fn file_store_run_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen_links.txt");
    let store = FileSeenStore::new(&path).with_max_seen(2000);
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let notifier = RecordingNotifier::new();

    let first = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;
    assert_eq!(first.new_count(), 2);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "https://x/1\nhttps://x/7\n"
    );

    let second = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;
    assert_eq!(second.new_count(), 0);
    assert_eq!(store.load().unwrap().len(), 2);
}

#[tokio::test]
async fn unreadable_store_counts_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    // a directory cannot be read (or written) as the store file
    let store = FileSeenStore::new(dir.path());
    let pipeline = Pipeline::new(watchlist(vec![acme()]), RunOptions::default());
    let notifier = RecordingNotifier::new();

    let report = pipeline
        .run_once(&ScriptedSource::new(), &store, &notifier, now_jst())
        .await;

    assert_eq!(report.seen_before, 0);
    assert_eq!(report.new_count(), 2);
    assert!(!report.persisted);
    assert_eq!(notifier.sent().len(), 1);
}
