// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
mod common;

use common::*;
use newsgate::history::HistoryStore;

#[tokio::test]
async fn metrics_exposed_after_run() {
    let handle = newsgate::metrics::install_prometheus().expect("recorder");

    let dir = tempfile::tempdir().unwrap();
    let mut history = HistoryStore::load(dir.path().join("history.json"), 300).unwrap();
    let provider = ScriptedProvider::always(ok("🌊 alert"));
    let notifier = RecordingNotifier::default();
    let mut coord = coordinator(&fast_config(), &provider, &notifier);
    let sources = one_per_source(vec![
        entry(HEADLINES[0], "https://m.test/0"),
        entry("Lottery jackpot grows", "https://m.test/1"),
    ]);
    coord.run_once(&sources, &mut history).await.unwrap();

    let out = handle.render();
    assert!(out.contains("pipeline_items_total"));
    assert!(out.contains("pipeline_blocked_total"));
    assert!(out.contains("pipeline_surfaced_total"));
    assert!(out.contains("pipeline_last_run_ts"));
}
