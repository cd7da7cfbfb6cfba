//! AI adapter: classification service contract + concrete providers.
//!
//! Providers return the raw reply text or a typed `ProviderError`; interpreting the
//! reply (sentinel, fallback) is the classification gate's job.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One chat-style request: a system prompt and a rendered user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// HTTP 429 or an equivalent "too many requests" signal.
    #[error("classification service is rate limiting requests")]
    Throttled,
    /// Missing or rejected credential; nothing will work until an operator fixes it.
    #[error("classification service unavailable: {0}")]
    Unavailable(String),
    /// Anything else: transport errors, 5xx, undecodable bodies.
    #[error("classification request failed: {0}")]
    Failed(String),
}

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// Low-level provider: does the real remote call.
pub trait Provider: Send + Sync {
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ProviderFuture<'a>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynProvider = Arc<dyn Provider>;

/// Factory: build a provider according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock provider.
/// * Else if `config.enabled==false`, returns a disabled provider.
/// * Else builds the OpenAI-compatible HTTP provider (Groq or OpenAI).
pub fn build_provider(config: &AiConfig) -> anyhow::Result<DynProvider> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockProvider::new("📰 Mock alert")));
    }

    if !config.enabled {
        return Ok(Arc::new(DisabledProvider));
    }

    Ok(Arc::new(OpenAiCompatProvider::new(config)?))
}

// ------------------------------------------------------------
// OpenAI-compatible Chat Completions provider
// ------------------------------------------------------------

pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatProvider {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("newsgate/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("building classifier http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model().to_string(),
            endpoint: format!("{}/chat/completions", config.base_url()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}
#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

/// Map an HTTP status to the provider error taxonomy. `None` means success.
pub fn classify_status(status: reqwest::StatusCode) -> Option<ProviderError> {
    use reqwest::StatusCode;
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::Throttled,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unavailable(format!("credential rejected ({status})"))
        }
        other => ProviderError::Failed(format!("http {other}")),
    })
}

impl Provider for OpenAiCompatProvider {
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ProviderFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(ProviderError::Unavailable("missing API key".to_string()));
            }

            let body = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: &req.system,
                    },
                    Msg {
                        role: "user",
                        content: &req.user,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Failed(e.to_string()))?;

            if let Some(err) = classify_status(resp.status()) {
                return Err(err);
            }

            let body: Resp = resp
                .json()
                .await
                .map_err(|e| ProviderError::Failed(format!("decode: {e}")))?;
            Ok(body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default())
        })
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

// ------------------------------------------------------------
// Disabled + mock providers
// ------------------------------------------------------------

/// Always unavailable; used when AI is disabled in config.
pub struct DisabledProvider;

impl Provider for DisabledProvider {
    fn complete<'a>(&'a self, _req: &'a ChatRequest) -> ProviderFuture<'a> {
        Box::pin(async { Err(ProviderError::Unavailable("AI disabled in config".to_string())) })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same reply for every request.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: &str) -> Self {
        Self {
            fixed: fixed.to_string(),
        }
    }
}

impl Provider for MockProvider {
    fn complete<'a>(&'a self, _req: &'a ChatRequest) -> ProviderFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
