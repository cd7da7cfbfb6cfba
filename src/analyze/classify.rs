// src/analyze/classify.rs
//! Classification gate: one external request per candidate, reply normalized into
//! a `ClassificationOutcome`.

use tracing::{debug, warn};

use crate::analyze::ai_adapter::{ChatRequest, DynProvider, ProviderError};
use crate::analyze::rate_limit::RateLimiter;
use crate::analyze::Candidate;
use crate::config::pipeline::ClassifierConfig;
use crate::ingest::{clean_for_prompt, normalize_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// Text to surface.
    Accept(String),
    /// Sentinel reply: drop silently.
    Reject,
    /// Rate limit still exhausted after retries.
    Throttled,
    /// Service cannot be used at all (credential missing or rejected).
    Unavailable,
    /// Call failed or came back empty; carries fallback text.
    Degraded(String),
}

/// What the classifier is asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub title: String,
    pub body: String,
    pub source_name: String,
    /// Recently surfaced titles/alerts, oldest first.
    pub recent_context: Vec<String>,
}

pub struct ClassificationGate {
    provider: DynProvider,
    limiter: RateLimiter,
    cfg: ClassifierConfig,
}

impl ClassificationGate {
    pub fn new(provider: DynProvider, limiter: RateLimiter, cfg: ClassifierConfig) -> Self {
        Self {
            provider,
            limiter,
            cfg,
        }
    }

    pub fn context_window(&self) -> usize {
        self.cfg.context_window
    }

    pub fn build_request(
        &self,
        candidate: &Candidate,
        recent_context: &[String],
    ) -> ClassificationRequest {
        ClassificationRequest {
            title: normalize_text(&candidate.title),
            body: clean_for_prompt(&candidate.raw_body, self.cfg.max_body_chars),
            source_name: candidate.source_name.clone(),
            recent_context: recent_context.to_vec(),
        }
    }

    pub fn render(&self, req: &ClassificationRequest) -> ChatRequest {
        let context = if req.recent_context.is_empty() {
            "(none)".to_string()
        } else {
            req.recent_context
                .iter()
                .map(|c| format!("- {c}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let max_words = self.cfg.max_words.to_string();
        let user = render_template(
            &self.cfg.prompt_template,
            &[
                ("source", req.source_name.as_str()),
                ("title", req.title.as_str()),
                ("body", req.body.as_str()),
                ("context", context.as_str()),
                ("sentinel", self.cfg.sentinel.as_str()),
                ("language", self.cfg.language.as_str()),
                ("max_words", max_words.as_str()),
            ],
        );
        ChatRequest {
            system: self.cfg.system_prompt.clone(),
            user,
        }
    }

    pub async fn classify(
        &self,
        candidate: &Candidate,
        recent_context: &[String],
    ) -> ClassificationOutcome {
        let req = self.build_request(candidate, recent_context);
        let chat = self.render(&req);

        let result = self.limiter.call(|| self.provider.complete(&chat)).await;
        match result {
            Ok(reply) => self.interpret(&reply, candidate),
            Err(ProviderError::Throttled) => ClassificationOutcome::Throttled,
            Err(ProviderError::Unavailable(why)) => {
                warn!(provider = self.provider.name(), reason = %why, "classifier unavailable");
                ClassificationOutcome::Unavailable
            }
            Err(e @ ProviderError::Failed(_)) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    link = %candidate.canonical_link,
                    "classifier failed; using fallback text"
                );
                ClassificationOutcome::Degraded(fallback_text(candidate))
            }
        }
    }

    /// Map a raw reply onto an outcome.
    pub fn interpret(&self, reply: &str, candidate: &Candidate) -> ClassificationOutcome {
        let text = normalize_reply(reply);
        let sentinel = self.cfg.sentinel.trim();
        if !sentinel.is_empty() && text.contains(sentinel) {
            debug!(link = %candidate.canonical_link, "classifier rejected item");
            return ClassificationOutcome::Reject;
        }
        if text.is_empty() {
            warn!(link = %candidate.canonical_link, "classifier returned empty reply; using fallback text");
            return ClassificationOutcome::Degraded(fallback_text(candidate));
        }
        ClassificationOutcome::Accept(text)
    }
}

/// Deterministic text used when the classifier gives nothing usable.
pub fn fallback_text(candidate: &Candidate) -> String {
    let title = normalize_text(&candidate.title);
    if title.is_empty() {
        candidate.source_name.clone()
    } else {
        title
    }
}

/// Trim, collapse whitespace, and peel wrapping quote pairs.
pub fn normalize_reply(reply: &str) -> String {
    let mut out = reply.split_whitespace().collect::<Vec<_>>().join(" ");
    const PAIRS: &[(char, char)] = &[
        ('"', '"'),
        ('\'', '\''),
        ('`', '`'),
        ('\u{201C}', '\u{201D}'),
        ('\u{2018}', '\u{2019}'),
        ('\u{00AB}', '\u{00BB}'),
    ];
    loop {
        let peeled = PAIRS.iter().find_map(|&(open, close)| {
            let inner = out.strip_prefix(open)?.strip_suffix(close)?;
            Some(inner.trim().to_string())
        });
        match peeled {
            Some(inner) => out = inner,
            None => break,
        }
    }
    out
}

/// Single-pass `{name}` substitution; unknown placeholders are left as-is and
/// substituted values are never re-scanned.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
