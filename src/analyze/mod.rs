// src/analyze/mod.rs
//! Per-item analysis stages: keyword gate, duplicate detection, classification.

pub mod ai_adapter;
pub mod classify;
pub mod dedup;
pub mod keyword_gate;
pub mod rate_limit;
pub mod similarity;

pub use classify::{ClassificationGate, ClassificationOutcome};
pub use dedup::{Deduplicator, DuplicateReason};
pub use keyword_gate::KeywordGate;
pub use rate_limit::RateLimiter;
pub use similarity::SimilarityMetric;

use crate::ingest::FeedEntry;

/// One feed entry under evaluation in the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub canonical_link: String,
    /// Source-provided body, may contain HTML; cleaned before it reaches the classifier.
    pub raw_body: String,
    pub source_name: String,
    pub image_url: Option<String>,
}

impl Candidate {
    pub fn from_entry(entry: FeedEntry, source_name: &str) -> Self {
        Self {
            title: entry.title,
            canonical_link: entry.link,
            raw_body: entry.summary.unwrap_or_default(),
            source_name: source_name.to_string(),
            image_url: entry.image_url,
        }
    }
}
