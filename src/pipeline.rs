// src/pipeline.rs
//! One full pass: query → fetch → window → classify → dedup → persist → digest → notify.
//!
//! Entities are processed strictly one after another. A failing entity is
//! recorded in the [`RunReport`] and never stops the others, persistence, or
//! the digest.

use chrono::{DateTime, FixedOffset};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::{Settings, TrackedEntity, Watchlist};
use crate::dedup::{RunDedup, SeenStore};
use crate::digest::{build_digest, DigestEntry, DigestWindow};
use crate::ingest::query::build_search_url;
use crate::ingest::types::FeedSource;
use crate::ingest::window::{filter_window, window_start};
use crate::notify::Notifier;
use crate::relevance::KeywordClassifier;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_items_fetched_total", "Items parsed from feeds.");
        describe_counter!("digest_items_new_total", "Items that survived window, relevance and dedup.");
        describe_counter!("digest_entity_errors_total", "Entities that failed (config or fetch).");
        describe_counter!("digest_notifications_total", "Digests accepted by a sink.");
        describe_counter!("digest_notification_errors_total", "Digest sends that failed.");
        describe_gauge!("digest_last_run_new_items", "New items found by the most recent run.");
    });
}

/// Where an entity failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Config,
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityOutcome {
    Completed {
        fetched: usize,
        in_window: usize,
        relevant: usize,
        new: usize,
    },
    Failed {
        stage: FailureStage,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub entity: String,
    pub outcome: EntityOutcome,
}

/// Aggregate result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub since: DateTime<FixedOffset>,
    pub now: DateTime<FixedOffset>,
    pub entities: Vec<EntityReport>,
    pub entries: Vec<DigestEntry>,
    pub seen_before: usize,
    pub seen_total: usize,
    /// Store written this run.
    pub persisted: bool,
    /// A digest was handed to the notifier and it returned Ok.
    pub notified: bool,
}

impl RunReport {
    pub fn new_count(&self) -> usize {
        self.entries.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities
            .iter()
            .filter(|r| matches!(r.outcome, EntityOutcome::Failed { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub lookback_hours: i64,
    pub feed_item_limit: usize,
    pub zone_label: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RunOptions {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            lookback_hours: s.lookback_hours,
            feed_item_limit: s.feed_item_limit,
            zone_label: s.zone.label.clone(),
        }
    }
}

pub struct Pipeline {
    watchlist: Watchlist,
    classifier: KeywordClassifier,
    opts: RunOptions,
}

impl Pipeline {
    pub fn new(watchlist: Watchlist, opts: RunOptions) -> Self {
        let classifier = KeywordClassifier::from_keywords(&watchlist.keywords);
        Self {
            watchlist,
            classifier,
            opts,
        }
    }

    fn query_keywords(&self) -> &[String] {
        if self.watchlist.keywords.query.is_empty() {
            &self.watchlist.keywords.positive
        } else {
            &self.watchlist.keywords.query
        }
    }

    /// Run every tracked entity, persist new links, then send the digest.
    pub async fn run_once(
        &self,
        source: &dyn FeedSource,
        store: &dyn SeenStore,
        notifier: &dyn Notifier,
        now: DateTime<FixedOffset>,
    ) -> RunReport {
        ensure_metrics_described();

        let since = window_start(now, self.opts.lookback_hours);
        let loaded = store.load().unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "seen store unreadable, starting empty");
            HashSet::new()
        });
        let mut dedup = RunDedup::new(loaded);
        let seen_before = dedup.seen_len();
        info!(%now, %since, seen = seen_before, "run started");

        let mut entries = Vec::new();
        let mut reports = Vec::with_capacity(self.watchlist.entities.len());
        for entity in &self.watchlist.entities {
            let outcome = self
                .process_entity(entity, source, &mut dedup, now, &mut entries)
                .await;
            if let EntityOutcome::Failed { stage, reason } = &outcome {
                warn!(entity = %entity.display_name, ?stage, error = %reason, "entity failed");
                counter!("digest_entity_errors_total").increment(1);
            }
            reports.push(EntityReport {
                entity: entity.display_name.clone(),
                outcome,
            });
        }

        // Commit dedup state before any notification attempt.
        let (persisted, seen_total) = match dedup.merged() {
            Some(all) => match store.save(&all) {
                Ok(()) => (true, all.len()),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "failed to persist seen links");
                    (false, all.len())
                }
            },
            None => (false, seen_before),
        };
        info!(added = dedup.new_len(), total = seen_total, persisted, "seen links updated");
        counter!("digest_items_new_total").increment(entries.len() as u64);
        gauge!("digest_last_run_new_items").set(entries.len() as f64);

        let window = DigestWindow {
            since,
            now,
            lookback_hours: self.opts.lookback_hours,
            zone_label: &self.opts.zone_label,
        };
        let notified = match build_digest(&entries, &window) {
            Some(msg) => match notifier.send(&msg).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(sink = notifier.name(), error = %format!("{e:#}"), "digest not delivered");
                    false
                }
            },
            None => {
                info!("no new items, email not sent");
                false
            }
        };

        RunReport {
            since,
            now,
            entities: reports,
            entries,
            seen_before,
            seen_total,
            persisted,
            notified,
        }
    }

    async fn process_entity(
        &self,
        entity: &TrackedEntity,
        source: &dyn FeedSource,
        dedup: &mut RunDedup,
        now: DateTime<FixedOffset>,
        entries: &mut Vec<DigestEntry>,
    ) -> EntityOutcome {
        let url = match build_search_url(entity, self.query_keywords(), &self.watchlist.feed) {
            Ok(u) => u,
            Err(e) => {
                return EntityOutcome::Failed {
                    stage: FailureStage::Config,
                    reason: format!("{e:#}"),
                }
            }
        };
        tracing::debug!(entity = %entity.display_name, source = source.name(), %url, "fetching");

        let items = match source.fetch(&url, self.opts.feed_item_limit).await {
            Ok(v) => v,
            Err(e) => {
                return EntityOutcome::Failed {
                    stage: FailureStage::Fetch,
                    reason: format!("{e:#}"),
                }
            }
        };
        let fetched = items.len();

        let windowed = filter_window(items, now, self.opts.lookback_hours);
        let in_window = windowed.len();

        let relevant: Vec<_> = windowed
            .into_iter()
            .filter(|c| {
                let r = self.classifier.evaluate(&c.item.classify_text());
                if !r.blocked_by.is_empty() {
                    tracing::debug!(link = %c.item.link, blocked_by = ?r.blocked_by, "noise veto");
                }
                r.relevant
            })
            .collect();

        let mut new = 0usize;
        for c in &relevant {
            if !dedup.take_if_new(&c.item.link) {
                continue;
            }
            new += 1;
            let entry = DigestEntry::from_item(&entity.display_name, c);
            info!(
                entity = %entity.display_name,
                at = %entry.timestamp,
                title = %entry.title,
                link = %entry.link,
                "new item"
            );
            entries.push(entry);
        }

        info!(
            entity = %entity.display_name,
            fetched,
            kept = in_window,
            relevant = relevant.len(),
            new,
            "entity done"
        );
        EntityOutcome::Completed {
            fetched,
            in_window,
            relevant: relevant.len(),
            new,
        }
    }
}
