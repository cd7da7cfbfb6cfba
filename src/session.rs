//! Run-scoped memory of items surfaced in the current run (not counted as prior history).
//!
//! Owned by the coordinator for exactly one run; a fresh one is created per run so
//! nothing leaks across runs.

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionEntry {
    /// Normalized, case-folded title used for similarity checks.
    title_key: String,
    /// Alert text that was sent for this item.
    text: String,
}

#[derive(Debug, Default)]
pub struct SessionMemory {
    entries: Vec<SessionEntry>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, title: &str, text: &str) {
        self.entries.push(SessionEntry {
            title_key: crate::ingest::match_key(title),
            text: text.to_string(),
        });
    }

    pub fn title_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.title_key.as_str())
    }

    /// Last `n` alert texts, oldest first.
    pub fn recent_texts(&self, n: usize) -> Vec<String> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
