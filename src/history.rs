//! Bounded, JSON-persisted log of items already surfaced or explicitly rejected.
//!
//! Read fully at run start, appended to in memory, overwritten fully at run end.
//! Eviction happens on save: only the newest `max_items` records are written.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HISTORY_PATH: &str = "history.json";
pub const DEFAULT_MAX_HISTORY_ITEMS: usize = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub title: String,
    #[serde(rename = "link")]
    pub canonical_link: String,
    #[serde(rename = "date", deserialize_with = "de_lenient_utc")]
    pub surfaced_at: DateTime<Utc>,
}

/// RFC 3339, or an offset-less ISO timestamp (older ledgers) taken as UTC.
fn de_lenient_utc<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("bad history date {raw:?}: {e}")))
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
    records: Vec<HistoryRecord>,
    appended: usize,
}

impl HistoryStore {
    /// Empty in-memory store that will be written to `path` on save.
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
            records: Vec::new(),
            appended: 0,
        }
    }

    /// Load from disk. A missing file yields an empty store; so does an unparsable one
    /// (logged), so a corrupt ledger never blocks alerts.
    pub fn load(path: impl Into<PathBuf>, cap: usize) -> Result<Self> {
        let mut store = Self::new(path, cap);
        match fs::read_to_string(&store.path) {
            Ok(s) => match serde_json::from_str::<Vec<HistoryRecord>>(&s) {
                Ok(records) => store.records = records,
                Err(e) => {
                    tracing::warn!(path = %store.path.display(), error = %e, "history unreadable; starting empty");
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("reading history {}", store.path.display()))
            }
        }
        Ok(store)
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended since load.
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn append(&mut self, title: &str, link: &str, at: DateTime<Utc>) {
        self.records.push(HistoryRecord {
            title: title.to_string(),
            canonical_link: link.to_string(),
            surfaced_at: at,
        });
        self.appended += 1;
    }

    /// Records that were on disk at load, without anything appended since.
    pub fn prior_records(&self) -> &[HistoryRecord] {
        &self.records[..self.records.len().saturating_sub(self.appended)]
    }

    /// Last `n` titles from before this run, oldest first.
    pub fn recent_titles(&self, n: usize) -> Vec<String> {
        let prior = self.prior_records();
        let start = prior.len().saturating_sub(n);
        prior[start..].iter().map(|r| r.title.clone()).collect()
    }

    /// Drop the oldest records beyond capacity.
    fn truncate_to_cap(&mut self) {
        if self.records.len() > self.cap {
            let excess = self.records.len() - self.cap;
            self.records.drain(0..excess);
        }
    }

    /// Truncate to capacity and overwrite the file (temp file + rename).
    pub fn save(&mut self) -> Result<()> {
        self.truncate_to_cap();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.records).context("encoding history")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        self.appended = 0;
        Ok(())
    }
}
