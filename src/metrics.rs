// src/metrics.rs
//! Metric descriptions and the optional Prometheus text dump (`METRICS_DUMP=1`).

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ENV_METRICS_DUMP: &str = "METRICS_DUMP";

/// One-time metrics registration (so series show up in the exposition text).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_items_total", "Feed entries considered by a run.");
        describe_counter!("pipeline_blocked_total", "Entries dropped by the keyword gate.");
        describe_counter!(
            "pipeline_duplicates_total",
            "Entries dropped as link or near-title duplicates."
        );
        describe_counter!("pipeline_rejected_total", "Entries the classifier rejected.");
        describe_counter!("pipeline_surfaced_total", "Alerts sent (accepted or degraded).");
        describe_counter!(
            "pipeline_degraded_total",
            "Alerts sent with fallback text after a classifier failure."
        );
        describe_counter!(
            "pipeline_source_errors_total",
            "Feed sources that failed to fetch or parse."
        );
        describe_counter!("pipeline_halts_total", "Runs halted by throttling or an unusable classifier.");
        describe_counter!(
            "classifier_retries_total",
            "Classifier calls retried after throttling."
        );
        describe_counter!("ingest_events_total", "Total entries parsed from feeds.");
        describe_counter!("scheduler_runs_total", "Runs started by the poll loop.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the last run finished.");
    });
}

pub fn dump_requested() -> bool {
    std::env::var(ENV_METRICS_DUMP)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Install the process-wide Prometheus recorder and describe all series.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}
