// tests/common/mod.rs
// In-process fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use newsgate::ai_adapter::{ChatRequest, Provider, ProviderError, ProviderFuture};
use newsgate::config::PipelineConfig;
use newsgate::ingest::{FeedEntry, FeedSource};
use newsgate::notify::{Notification, Notifier, NotifierMux};
use newsgate::{build_coordinator, RunCoordinator};

/// Replays a script of replies, then repeats `fallback` forever. Records every request.
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    fallback: Result<String, ProviderError>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    pub fn new(
        script: Vec<Result<String, ProviderError>>,
        fallback: Result<String, ProviderError>,
    ) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(reply: Result<String, ProviderError>) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

impl Provider for ScriptedProvider {
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ProviderFuture<'a> {
        self.requests.lock().push(req.clone());
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { next })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Keeps every notification it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        self.sent.lock().push(n.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct VecSource {
    pub name: String,
    pub entries: Vec<FeedEntry>,
}

#[async_trait]
impl FeedSource for VecSource {
    async fn fetch_latest(&self) -> Result<Vec<FeedEntry>> {
        Ok(self.entries.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct FailingSource;

#[async_trait]
impl FeedSource for FailingSource {
    async fn fetch_latest(&self) -> Result<Vec<FeedEntry>> {
        anyhow::bail!("connection refused")
    }

    fn name(&self) -> &str {
        "Broken Feed"
    }
}

pub fn entry(title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        summary: Some(format!("<p>{title}.</p>")),
        ..Default::default()
    }
}

/// One source per entry, named "Source {i}".
pub fn one_per_source(entries: Vec<FeedEntry>) -> Vec<Box<dyn FeedSource>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            Box::new(VecSource {
                name: format!("Source {i}"),
                entries: vec![e],
            }) as Box<dyn FeedSource>
        })
        .collect()
}

/// Defaults with pacing and cool-down zeroed so tests without paused time stay fast.
pub fn fast_config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.run.pacing_secs = 0;
    cfg.rate_limit.cooldown_secs = 0;
    cfg
}

pub fn coordinator(
    cfg: &PipelineConfig,
    provider: &ScriptedProvider,
    notifier: &RecordingNotifier,
) -> RunCoordinator {
    let mux = NotifierMux::default().with(Box::new(notifier.clone()));
    build_coordinator(cfg, Arc::new(provider.clone()), mux)
}

pub fn ok(s: &str) -> Result<String, ProviderError> {
    Ok(s.to_string())
}

/// Ten unrelated headlines, far apart under the default threshold.
pub const HEADLINES: [&str; 10] = [
    "Quake hits coast",
    "Central bank raises interest rates",
    "Wildfire forces thousands to evacuate",
    "Parliament passes new budget",
    "Ceasefire talks resume in Geneva",
    "Oil tanker seized near strait",
    "Flood warnings issued across delta",
    "Vaccine rollout expands to children",
    "Satellite launch delayed by weather",
    "Border crossing reopens after months",
];
