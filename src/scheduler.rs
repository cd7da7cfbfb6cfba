// src/scheduler.rs
//! Poll loop: repeat whole runs on a fixed interval. Runs never overlap because each
//! tick awaits the previous run to completion.

use std::time::Duration;

use metrics::counter;
use tokio::time::MissedTickBehavior;

use crate::config::pipeline::HistoryConfig;
use crate::history::HistoryStore;
use crate::ingest::FeedSource;
use crate::pipeline::{RunCoordinator, RunReport};

pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    /// Stop after this many runs; `None` loops forever.
    pub max_runs: Option<usize>,
}

impl SchedulerCfg {
    /// `Some` when POLL_INTERVAL_SECS is a positive integer.
    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_POLL_INTERVAL_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&s| s > 0)
            .map(|interval_secs| Self {
                interval_secs,
                max_runs: None,
            })
    }
}

/// History is reloaded from disk every tick so each run sees what the last one saved.
/// A failing run is logged and the loop carries on.
pub async fn run_scheduler(
    cfg: SchedulerCfg,
    coordinator: &mut RunCoordinator,
    sources: &[Box<dyn FeedSource>],
    history_cfg: &HistoryConfig,
) -> Vec<RunReport> {
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reports = Vec::new();
    let mut runs = 0usize;

    loop {
        if cfg.max_runs.is_some_and(|max| runs >= max) {
            break;
        }
        ticker.tick().await;
        runs += 1;
        counter!("scheduler_runs_total").increment(1);

        let mut history = match HistoryStore::load(&history_cfg.path, history_cfg.max_items) {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(error = ?e, "history load failed; skipping tick");
                continue;
            }
        };
        match coordinator.run_once(sources, &mut history).await {
            Ok(report) => {
                tracing::info!(run = runs, surfaced = report.surfaced, halted = ?report.halted, "scheduled run done");
                reports.push(report);
            }
            Err(e) => tracing::error!(run = runs, error = ?e, "scheduled run failed"),
        }
    }
    reports
}
