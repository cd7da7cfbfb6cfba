// src/pipeline.rs
//! Run Coordinator: one sequential pass over every source.
//!
//! Per item: keyword gate, duplicate check, classify, then commit (notify, record,
//! remember, pace). A throttled or unusable classifier halts the run; whatever was
//! recorded up to that point is still persisted.

use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tracing::{debug, error, info, warn};

use crate::analyze::{
    Candidate, ClassificationGate, ClassificationOutcome, Deduplicator, DuplicateReason,
    KeywordGate,
};
use crate::config::pipeline::RunConfig;
use crate::history::HistoryStore;
use crate::ingest::FeedSource;
use crate::notify::{Notification, NotifierMux};
use crate::session::SessionMemory;

pub const UNUSABLE_NOTICE: &str =
    "Classification service unusable (missing or rejected credential); run halted.";

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub entries_per_source: usize,
    pub pacing: Duration,
    pub record_rejects: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for RunSettings {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            entries_per_source: cfg.entries_per_source.max(1),
            pacing: cfg.pacing(),
            record_rejects: cfg.record_rejects,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    Throttled,
    ServiceUnusable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ScanningSource,
    ItemGate,
    ItemClassify,
    ItemCommit,
    Finished,
    Halted(HaltReason),
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDisposition {
    Blocked { keyword: String },
    Duplicate(DuplicateReason),
    Rejected,
    Surfaced { text: String, degraded: bool },
    Halted(HaltReason),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub sources_scanned: usize,
    pub source_errors: usize,
    pub items_seen: usize,
    pub blocked: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub surfaced: usize,
    pub degraded: usize,
    pub halted: Option<HaltReason>,
    pub history_saved: bool,
    pub history_len: usize,
}

impl RunReport {
    fn tally(&mut self, d: &ItemDisposition) {
        match d {
            ItemDisposition::Blocked { .. } => {
                self.blocked += 1;
                counter!("pipeline_blocked_total").increment(1);
            }
            ItemDisposition::Duplicate(_) => {
                self.duplicates += 1;
                counter!("pipeline_duplicates_total").increment(1);
            }
            ItemDisposition::Rejected => {
                self.rejected += 1;
                counter!("pipeline_rejected_total").increment(1);
            }
            ItemDisposition::Surfaced { degraded, .. } => {
                self.surfaced += 1;
                counter!("pipeline_surfaced_total").increment(1);
                if *degraded {
                    self.degraded += 1;
                    counter!("pipeline_degraded_total").increment(1);
                }
            }
            ItemDisposition::Halted(reason) => {
                self.halted = Some(*reason);
                counter!("pipeline_halts_total").increment(1);
            }
        }
    }
}

pub struct RunCoordinator {
    gate: KeywordGate,
    dedup: Deduplicator,
    classifier: ClassificationGate,
    notifier: NotifierMux,
    settings: RunSettings,
    state: RunState,
}

impl RunCoordinator {
    pub fn new(
        gate: KeywordGate,
        dedup: Deduplicator,
        classifier: ClassificationGate,
        notifier: NotifierMux,
        settings: RunSettings,
    ) -> Self {
        Self {
            gate,
            dedup,
            classifier,
            notifier,
            settings,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// One full run. Session memory lives only for this call.
    pub async fn run_once(
        &mut self,
        sources: &[Box<dyn FeedSource>],
        history: &mut HistoryStore,
    ) -> anyhow::Result<RunReport> {
        crate::metrics::ensure_metrics_described();
        let mut session = SessionMemory::new();
        let mut report = RunReport::default();
        self.state = RunState::Idle;

        'sources: for source in sources {
            self.state = RunState::ScanningSource;
            report.sources_scanned += 1;
            let entries = match source.fetch_latest().await {
                Ok(v) => v,
                Err(e) => {
                    warn!(source = source.name(), error = ?e, "source unavailable; skipping");
                    counter!("pipeline_source_errors_total").increment(1);
                    report.source_errors += 1;
                    continue;
                }
            };

            for entry in entries.into_iter().take(self.settings.entries_per_source) {
                report.items_seen += 1;
                counter!("pipeline_items_total").increment(1);
                let candidate = Candidate::from_entry(entry, source.name());

                let disposition = self.process(&candidate, history, &mut session).await;
                report.tally(&disposition);
                if let ItemDisposition::Halted(reason) = disposition {
                    self.state = RunState::Halted(reason);
                    break 'sources;
                }
            }
        }

        if !matches!(self.state, RunState::Halted(_)) {
            self.state = RunState::Finished;
        }

        if history.appended() > 0 {
            history
                .save()
                .map_err(|e| {
                    error!(path = %history.path().display(), error = ?e, "saving history failed");
                    e
                })?;
            report.history_saved = true;
        }
        report.history_len = history.len();
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        info!(
            sources = report.sources_scanned,
            source_errors = report.source_errors,
            items = report.items_seen,
            blocked = report.blocked,
            duplicates = report.duplicates,
            rejected = report.rejected,
            surfaced = report.surfaced,
            degraded = report.degraded,
            halted = ?report.halted,
            history_len = report.history_len,
            "run finished"
        );
        Ok(report)
    }

    async fn process(
        &mut self,
        candidate: &Candidate,
        history: &mut HistoryStore,
        session: &mut SessionMemory,
    ) -> ItemDisposition {
        self.state = RunState::ItemGate;
        if let Some(keyword) = self.gate.blocked_by(&candidate.title) {
            debug!(source = %candidate.source_name, keyword, "blocked by keyword");
            return ItemDisposition::Blocked {
                keyword: keyword.to_string(),
            };
        }
        if let Some(reason) = self.dedup.check(candidate, history.records(), session) {
            debug!(source = %candidate.source_name, link = %candidate.canonical_link, ?reason, "duplicate");
            return ItemDisposition::Duplicate(reason);
        }

        self.state = RunState::ItemClassify;
        let context = recent_context(history, session, self.classifier.context_window());
        let outcome = self.classifier.classify(candidate, &context).await;

        let (text, degraded) = match outcome {
            ClassificationOutcome::Accept(text) => (text, false),
            ClassificationOutcome::Degraded(text) => (text, true),
            ClassificationOutcome::Reject => {
                if self.settings.record_rejects {
                    history.append(&candidate.title, &candidate.canonical_link, Utc::now());
                }
                return ItemDisposition::Rejected;
            }
            ClassificationOutcome::Throttled => {
                warn!(source = %candidate.source_name, "classifier throttled after retries; halting run");
                return ItemDisposition::Halted(HaltReason::Throttled);
            }
            ClassificationOutcome::Unavailable => {
                error!("classification service unusable; halting run");
                self.notifier.notify(&Notification::system(UNUSABLE_NOTICE)).await;
                return ItemDisposition::Halted(HaltReason::ServiceUnusable);
            }
        };

        self.state = RunState::ItemCommit;
        let note = Notification::alert(
            &text,
            &candidate.canonical_link,
            &candidate.source_name,
            candidate.image_url.clone(),
        );
        self.notifier.notify(&note).await;
        history.append(&candidate.title, &candidate.canonical_link, Utc::now());
        session.remember(&candidate.title, &text);
        info!(source = %candidate.source_name, link = %candidate.canonical_link, degraded, "surfaced");

        if !self.settings.pacing.is_zero() {
            tokio::time::sleep(self.settings.pacing).await;
        }
        ItemDisposition::Surfaced { text, degraded }
    }
}

/// Last `window` context lines, most recent last: titles recorded before this run, then
/// this run's alert texts. Items surfaced in this run appear once, as their alert text.
pub fn recent_context(history: &HistoryStore, session: &SessionMemory, window: usize) -> Vec<String> {
    let mut ctx = history.recent_titles(window);
    ctx.extend(session.recent_texts(window));
    let start = ctx.len().saturating_sub(window);
    ctx.split_off(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_most_recent_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut h = HistoryStore::new(&path, 10);
        for i in 0..4 {
            h.append(&format!("h{i}"), &format!("l{i}"), Utc::now());
        }
        h.save().unwrap();

        let mut h = HistoryStore::load(&path, 10).unwrap();
        let mut s = SessionMemory::new();
        h.append("t1", "l5", Utc::now());
        s.remember("t1", "alert one");
        h.append("t2", "l6", Utc::now());
        s.remember("t2", "alert two");
        assert_eq!(
            recent_context(&h, &s, 3),
            vec!["h3".to_string(), "alert one".into(), "alert two".into()]
        );
        assert!(recent_context(&h, &s, 0).is_empty());
    }

    #[tokio::test]
    async fn same_run_repeat_is_caught_by_session_memory() {
        let mut coord = crate::build_coordinator(
            &crate::PipelineConfig::default(),
            std::sync::Arc::new(crate::ai_adapter::MockProvider::new("unused")),
            NotifierMux::default(),
        );
        let mut history = HistoryStore::new("unused.json", 10);
        let mut session = SessionMemory::new();
        history.append("Quake hits coast", "A", Utc::now());
        session.remember("Quake hits coast", "🌊 Quake hits coast");

        let candidate = Candidate {
            title: "Quake hits coast".into(),
            canonical_link: "B".into(),
            raw_body: String::new(),
            source_name: "Sky News".into(),
            image_url: None,
        };
        let d = coord.process(&candidate, &mut history, &mut session).await;
        assert!(matches!(d, ItemDisposition::Duplicate(DuplicateReason::Session { .. })));
        assert_eq!(coord.state(), RunState::ItemGate);
    }

    #[test]
    fn settings_follow_run_config() {
        let s = RunSettings::default();
        assert_eq!(s.entries_per_source, 1);
        assert_eq!(s.pacing, Duration::from_secs(15));
        assert!(s.record_rejects);
    }
}
