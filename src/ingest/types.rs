// src/ingest/types.rs
use anyhow::Result;

/// One entry as read from a feed, before it becomes a pipeline candidate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: Option<String>, // raw, may carry HTML
    pub image_url: Option<String>,
    pub published_at: u64, // unix seconds, 0 if unknown
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in feed order (newest first for most publishers).
    async fn fetch_latest(&self) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &str;
}

/// Feed declaration as loaded from `config/sources.toml`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
}
