// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "groq".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    120
}
fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "groq" | "openai" (case-insensitive). Both speak the Chat Completions protocol.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// "ENV" means: read from GROQ_API_KEY / OPENAI_API_KEY (by provider).
    /// A missing variable resolves to an empty key, which the provider reports as unavailable.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key: default_api_key(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.normalized()
    }

    /// `$AI_CONFIG_PATH`, then `config/ai.json`, then built-in defaults.
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        if Path::new(DEFAULT_AI_CONFIG_PATH).exists() {
            return Self::load_from_file(DEFAULT_AI_CONFIG_PATH);
        }
        Self::default().normalized()
    }

    fn normalized(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "groq" => env::var("GROQ_API_KEY").unwrap_or_default(),
                "openai" => env::var("OPENAI_API_KEY").unwrap_or_default(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }
        self.api_key = self.api_key.trim().to_string();

        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        Ok(self)
    }

    pub fn model(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(m), _) if !m.trim().is_empty() => m.trim(),
            (_, "openai") => "gpt-4o-mini",
            _ => "llama-3.3-70b-versatile",
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider.as_str()) {
            (Some(u), _) if !u.trim().is_empty() => u.trim().trim_end_matches('/'),
            (_, "openai") => OPENAI_BASE_URL,
            _ => GROQ_BASE_URL,
        }
    }
}
