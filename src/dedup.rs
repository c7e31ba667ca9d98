//! dedup.rs: URLs already surfaced in earlier runs.
//!
//! The store is read once per run, consulted in memory, and written back once
//! at the end if anything new was found. On write the set is sorted and only
//! the lexicographically last `max_seen` links are kept.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::settings::DEFAULT_MAX_SEEN;

/// Repository for the seen-link set.
pub trait SeenStore {
    fn load(&self) -> Result<HashSet<String>>;
    fn save(&self, seen: &HashSet<String>) -> Result<()>;
}

/// Sorted ascending, capped to the last `max_seen`.
pub fn bounded_sorted(seen: &HashSet<String>, max_seen: usize) -> Vec<&str> {
    let mut links: Vec<&str> = seen.iter().map(String::as_str).collect();
    links.sort_unstable();
    let start = links.len().saturating_sub(max_seen);
    links.split_off(start)
}

/// One link per line, UTF-8.
#[derive(Debug, Clone)]
pub struct FileSeenStore {
    path: PathBuf,
    max_seen: usize,
}

impl FileSeenStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            max_seen: DEFAULT_MAX_SEEN,
        }
    }

    pub fn with_max_seen(mut self, max_seen: usize) -> Self {
        self.max_seen = max_seen.max(1);
        self
    }
}

impl SeenStore for FileSeenStore {
    fn load(&self) -> Result<HashSet<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading seen links from {}", self.path.display()))
            }
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn save(&self, seen: &HashSet<String>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let links = bounded_sorted(seen, self.max_seen);
        let mut out = links.join("\n");
        out.push('\n');
        fs::write(&self.path, out)
            .with_context(|| format!("writing seen links to {}", self.path.display()))
    }
}

/// In-memory store applying the same bound as the file store.
#[derive(Debug)]
pub struct MemorySeenStore {
    inner: Mutex<HashSet<String>>,
    max_seen: usize,
    saves: Mutex<usize>,
}

impl MemorySeenStore {
    pub fn new(max_seen: usize) -> Self {
        Self {
            inner: Mutex::new(HashSet::new()),
            max_seen: max_seen.max(1),
            saves: Mutex::new(0),
        }
    }

    pub fn with_links<I, S>(max_seen: usize, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new(max_seen);
        if let Ok(mut g) = store.inner.lock() {
            g.extend(links.into_iter().map(Into::into));
        }
        store
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.inner.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// How many times `save` ran.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|g| *g).unwrap_or_default()
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> Result<HashSet<String>> {
        Ok(self.snapshot())
    }

    fn save(&self, seen: &HashSet<String>) -> Result<()> {
        let kept: HashSet<String> = bounded_sorted(seen, self.max_seen)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut g = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("seen store mutex poisoned"))?;
        *g = kept;
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Splits candidates into new vs. already-seen for one run.
///
/// A link is new if it is non-empty, absent from the loaded set, and not
/// already taken earlier in the same run.
#[derive(Debug, Default)]
pub struct RunDedup {
    seen: HashSet<String>,
    new_links: HashSet<String>,
}

impl RunDedup {
    pub fn new(seen: HashSet<String>) -> Self {
        Self {
            seen,
            new_links: HashSet::new(),
        }
    }

    /// Returns true and records the link if it is new.
    pub fn take_if_new(&mut self, link: &str) -> bool {
        if link.is_empty() || self.seen.contains(link) {
            return false;
        }
        self.new_links.insert(link.to_string())
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn new_len(&self) -> usize {
        self.new_links.len()
    }

    /// Merge the new links into the seen set, only if there are any.
    /// Returns the merged set when a write is due.
    pub fn merged(&self) -> Option<HashSet<String>> {
        if self.new_links.is_empty() {
            return None;
        }
        let mut all = self.seen.clone();
        all.extend(self.new_links.iter().cloned());
        Some(all)
    }
}
