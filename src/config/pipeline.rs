// src/config/pipeline.rs
//! Pipeline tuning loaded from `config/pipeline.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Env overrides: DEDUP_THRESHOLD (clamped to 0..=1), HISTORY_PATH, PACING_SECS.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::keyword_gate::DEFAULT_BLOCKED_KEYWORDS;
use crate::analyze::similarity::SimilarityMetric;
use crate::history::{DEFAULT_HISTORY_PATH, DEFAULT_MAX_HISTORY_ITEMS};
use crate::ingest::DEFAULT_MAX_BODY_CHARS;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_DEDUP_THRESHOLD: &str = "DEDUP_THRESHOLD";
pub const ENV_HISTORY_PATH: &str = "HISTORY_PATH";
pub const ENV_PACING_SECS: &str = "PACING_SECS";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an assistant that turns news items into one-line push alerts.";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a global news intelligence service.

TASK:
1. Read the item below. It may be written in any language.
2. Answer ONLY in {language}.
3. If the item is celebrity gossip, sports, horoscope or a minor local accident, or if it \
reports the same event as one of the recent alerts listed below, reply with only {sentinel}.
4. Otherwise start with one emoji that fits the event and summarize the outcome in at most \
{max_words} words. Never write \"The article says\"; state the event directly.

Recent alerts (oldest first):
{context}

Source: {source}
Title: {title}
Content: {body}";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub history: HistoryConfig,
    pub dedup: DedupConfig,
    pub gate: GateConfig,
    pub classifier: ClassifierConfig,
    pub rate_limit: RateLimitConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub max_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_PATH),
            max_items: DEFAULT_MAX_HISTORY_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub threshold: f64,
    pub metric: SimilarityMetric,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: crate::analyze::dedup::DEFAULT_SIMILARITY_THRESHOLD,
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub blocked_keywords: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: DEFAULT_BLOCKED_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Reply token meaning "not worth surfacing".
    pub sentinel: String,
    pub language: String,
    pub max_words: u32,
    pub max_body_chars: usize,
    /// How many recent alerts are handed to the classifier as context.
    pub context_window: usize,
    pub system_prompt: String,
    pub prompt_template: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sentinel: "SKIP".to_string(),
            language: "Turkish".to_string(),
            max_words: 15,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            context_window: 10,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_retries: u32,
    pub cooldown_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            cooldown_secs: 20,
        }
    }
}

impl RateLimitConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub entries_per_source: usize,
    pub pacing_secs: u64,
    /// Write classifier rejects to history so they are never classified again.
    pub record_rejects: bool,
    pub fetch_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            entries_per_source: 1,
            pacing_secs: 15,
            record_rejects: true,
            fetch_timeout_secs: 15,
        }
    }
}

impl RunConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config at {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing pipeline config at {}", path.display()))
    }

    /// `$PIPELINE_CONFIG_PATH` or `config/pipeline.toml` (defaults when absent), then env overrides.
    pub fn load_default() -> anyhow::Result<Self> {
        let explicit = std::env::var(ENV_PIPELINE_CONFIG_PATH).ok().map(PathBuf::from);
        let mut cfg = match explicit {
            Some(p) => Self::load_from_file(&p)?,
            None if Path::new(DEFAULT_PIPELINE_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_PIPELINE_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_DEDUP_THRESHOLD).ok()) {
            self.dedup.threshold = t;
        }
        if let Ok(p) = std::env::var(ENV_HISTORY_PATH) {
            if !p.trim().is_empty() {
                self.history.path = PathBuf::from(p.trim());
            }
        }
        if let Some(secs) = std::env::var(ENV_PACING_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.run.pacing_secs = secs;
        }
    }

    fn sanitized(mut self) -> Self {
        if !self.dedup.threshold.is_finite() {
            self.dedup.threshold = DedupConfig::default().threshold;
        }
        self.dedup.threshold = self.dedup.threshold.clamp(0.0, 1.0);
        self.history.max_items = self.history.max_items.max(1);
        self.run.entries_per_source = self.run.entries_per_source.max(1);
        if self.classifier.max_body_chars == 0 {
            self.classifier.max_body_chars = DEFAULT_MAX_BODY_CHARS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let cfg = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.history.max_items, 300);
        assert_eq!(cfg.dedup.threshold, 0.65);
        assert_eq!(cfg.dedup.metric, SimilarityMetric::Sequence);
        assert_eq!(cfg.classifier.sentinel, "SKIP");
        assert_eq!(cfg.classifier.language, "Turkish");
        assert_eq!(cfg.run.entries_per_source, 1);
        assert!(cfg.run.record_rejects);
        assert!(cfg.gate.blocked_keywords.iter().any(|k| k == "galatasaray"));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
[dedup]
threshold = 1.7
metric = "levenshtein"

[run]
record_rejects = false
entries_per_source = 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.dedup.threshold, 1.0);
        assert_eq!(cfg.dedup.metric, SimilarityMetric::Levenshtein);
        assert!(!cfg.run.record_rejects);
        assert_eq!(cfg.run.entries_per_source, 1);
        assert_eq!(cfg.run.pacing_secs, 15);
    }

    #[test]
    fn threshold_env_parsing() {
        assert_eq!(parse_threshold_env(Some(" 0.72 ".into())), Some(0.72));
        assert_eq!(parse_threshold_env(Some("5".into())), Some(1.0));
        assert_eq!(parse_threshold_env(Some("NaN".into())), None);
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        std::env::set_var(ENV_DEDUP_THRESHOLD, "0.7");
        std::env::set_var(ENV_HISTORY_PATH, "/tmp/h.json");
        std::env::set_var(ENV_PACING_SECS, "0");
        let mut cfg = PipelineConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.dedup.threshold, 0.7);
        assert_eq!(cfg.history.path, PathBuf::from("/tmp/h.json"));
        assert_eq!(cfg.run.pacing_secs, 0);
        std::env::remove_var(ENV_DEDUP_THRESHOLD);
        std::env::remove_var(ENV_HISTORY_PATH);
        std::env::remove_var(ENV_PACING_SECS);
    }
}
