// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod session;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use analyze::{
    Candidate, ClassificationGate, ClassificationOutcome, Deduplicator, KeywordGate, RateLimiter,
};
pub use config::{AiConfig, PipelineConfig};
pub use history::{HistoryRecord, HistoryStore};
pub use ingest::{FeedEntry, FeedSource};
pub use notify::{Notification, Notifier, NotifierMux};
pub use pipeline::{HaltReason, ItemDisposition, RunCoordinator, RunReport, RunSettings};
pub use session::SessionMemory;

use analyze::ai_adapter::DynProvider;

/// Wire the per-item stages from configuration.
pub fn build_coordinator(
    cfg: &PipelineConfig,
    provider: DynProvider,
    notifier: NotifierMux,
) -> RunCoordinator {
    let gate = KeywordGate::new(cfg.gate.blocked_keywords.iter());
    let dedup = Deduplicator::new(cfg.dedup.threshold, cfg.dedup.metric);
    let limiter = RateLimiter::new(cfg.rate_limit.max_retries, cfg.rate_limit.cooldown());
    let classifier = ClassificationGate::new(provider, limiter, cfg.classifier.clone());
    RunCoordinator::new(gate, dedup, classifier, notifier, RunSettings::from(&cfg.run))
}

/// RSS/Atom sources over one shared HTTP client.
pub fn build_sources(
    specs: &[ingest::SourceSpec],
    fetch_timeout_secs: u64,
) -> anyhow::Result<Vec<Box<dyn FeedSource>>> {
    let client = ingest::providers::http_client(fetch_timeout_secs)?;
    Ok(specs
        .iter()
        .map(|s| {
            Box::new(ingest::providers::RssProvider::from_spec(s, client.clone()))
                as Box<dyn FeedSource>
        })
        .collect())
}
