//! # Watchlist
//!
//! Tracked companies plus the keyword sets used to query and classify news.
//!
//! - Loads from a TOML file (`[feed]`, `[keywords]`, `[[entities]]`).
//! - Every section is optional; missing parts fall back to `default_seed()`.
//! - Aliases are trimmed and deduplicated case-insensitively (first spelling wins).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// An organization monitored for HR news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntity {
    pub display_name: String,
    pub aliases: Vec<String>,
}

impl TrackedEntity {
    pub fn new<S: Into<String>>(display_name: S, aliases: Vec<String>) -> Self {
        Self {
            display_name: display_name.into(),
            aliases: clean_aliases(aliases),
        }
    }

    /// Entity searched by its display name only.
    pub fn named<S: Into<String>>(display_name: S) -> Self {
        let name = display_name.into();
        Self::new(name.clone(), vec![name])
    }
}

fn clean_aliases(items: Vec<String>) -> Vec<String> {
    let mut seen_lower = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if t.is_empty() {
            continue;
        }
        if seen_lower.insert(t.to_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}

/// Locale parameters appended to every feed search URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedLocale {
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default = "default_gl")]
    pub gl: String,
    #[serde(default = "default_ceid")]
    pub ceid: String,
}

fn default_hl() -> String {
    "ja".into()
}
fn default_gl() -> String {
    "JP".into()
}
fn default_ceid() -> String {
    "JP:ja".into()
}

impl Default for FeedLocale {
    fn default() -> Self {
        Self {
            hl: default_hl(),
            gl: default_gl(),
            ceid: default_ceid(),
        }
    }
}

/// Positive (HR) and negative (noise) terms, plus the terms put into the search query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordSets {
    #[serde(default = "default_positive")]
    pub positive: Vec<String>,
    #[serde(default = "default_negative")]
    pub negative: Vec<String>,
    /// Empty means "query with `positive`".
    #[serde(default = "default_query")]
    pub query: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            positive: default_positive(),
            negative: default_negative(),
            query: default_query(),
        }
    }
}

fn to_strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn default_positive() -> Vec<String> {
    to_strings(&[
        "人事", "異動", "就任", "退任", "昇進", "新任", "任命", "発令", "役員", "社長", "取締役",
        "執行役員", "CEO", "CFO", "COO", "appointment", "appointed", "resignation", "resigned",
        "promotion", "executive", "board", "management",
    ])
}

fn default_negative() -> Vec<String> {
    to_strings(&[
        "決算", "業績", "売上", "株価", "新製品", "キャンペーン", "広告", "インタビュー", "採用",
        "求人", "募集", "新卒", "中途", "hiring", "recruit", "job opening",
    ])
}

fn default_query() -> Vec<String> {
    to_strings(&[
        "人事", "異動", "就任", "退任", "昇進", "役員", "社長", "任命", "発令", "appointment",
        "appointed", "resignation", "resigned", "promotion", "executive",
    ])
}

#[derive(Debug, Clone, Deserialize)]
struct EntityCfg {
    name: String,
    /// Absent → search by `name` only.
    #[serde(default)]
    aliases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct WatchlistToml {
    #[serde(default)]
    feed: FeedLocale,
    #[serde(default)]
    keywords: KeywordSets,
    #[serde(default)]
    entities: Option<Vec<EntityCfg>>,
}

/// Everything the pipeline needs to know about *what* to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    pub feed: FeedLocale,
    pub keywords: KeywordSets,
    pub entities: Vec<TrackedEntity>,
}

impl Default for Watchlist {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl Watchlist {
    /// Built-in list; used when no watchlist file exists.
    pub fn default_seed() -> Self {
        Self {
            feed: FeedLocale::default(),
            keywords: KeywordSets::default(),
            entities: ["artience", "DIC", "Mimaki"]
                .into_iter()
                .map(TrackedEntity::named)
                .collect(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: WatchlistToml = toml::from_str(s).context("parsing watchlist toml")?;
        let entities = match raw.entities {
            Some(list) => list
                .into_iter()
                .map(|e| {
                    let aliases = e.aliases.unwrap_or_else(|| vec![e.name.clone()]);
                    TrackedEntity::new(e.name.trim(), aliases)
                })
                .collect(),
            None => Self::default_seed().entities,
        };
        Ok(Self {
            feed: raw.feed,
            keywords: raw.keywords,
            entities,
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watchlist from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Missing file → seed. Unreadable or invalid file → seed, with the error logged.
    pub fn load_or_seed<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no watchlist file, using built-in seed");
            return Self::default_seed();
        }
        match Self::load_from_file(path) {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "watchlist unusable, using built-in seed");
                Self::default_seed()
            }
        }
    }
}
