//! Push delivery. Best-effort: a failed send is logged and dropped, never retried,
//! and never fails the run.

pub mod discord;
pub mod email;
pub mod ntfy;
pub mod slack;

use anyhow::Result;
use tracing::{debug, warn};

pub use discord::DiscordNotifier;
pub use email::EmailSender;
pub use ntfy::NtfyNotifier;
pub use slack::SlackNotifier;

/// Label used for operator-facing messages (e.g. classifier unusable).
pub const SYSTEM_SOURCE_LABEL: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub click_url: Option<String>,
    pub source_label: String,
    pub image_url: Option<String>,
}

impl Notification {
    pub fn alert(message: &str, link: &str, source: &str, image_url: Option<String>) -> Self {
        Self {
            message: message.to_string(),
            click_url: (!link.is_empty()).then(|| link.to_string()),
            source_label: source.to_string(),
            image_url,
        }
    }

    pub fn system(message: &str) -> Self {
        Self {
            message: message.to_string(),
            click_url: None,
            source_label: SYSTEM_SOURCE_LABEL.to_string(),
            image_url: None,
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, n: &Notification) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans a notification out to every configured channel.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Channels enabled by environment: NTFY_TOPIC, DISCORD_WEBHOOK_URL, SLACK_WEBHOOK_URL, SMTP_*.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(n) = NtfyNotifier::from_env() {
            channels.push(Box::new(n));
        }
        if let Some(d) = DiscordNotifier::from_env() {
            channels.push(Box::new(d));
        }
        if let Some(s) = SlackNotifier::from_env() {
            channels.push(Box::new(s));
        }
        match EmailSender::from_env() {
            Ok(Some(e)) => channels.push(Box::new(e)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "email channel misconfigured; skipping"),
        }
        if channels.is_empty() {
            warn!("no notification channel configured; alerts will only be logged");
        }
        Self { channels }
    }

    pub fn with(mut self, channel: Box<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn notify(&self, n: &Notification) {
        if self.channels.is_empty() {
            tracing::info!(source = %n.source_label, message = %n.message, "alert (no channels)");
            return;
        }
        for ch in &self.channels {
            match ch.send(n).await {
                Ok(()) => debug!(channel = ch.name(), "notification sent"),
                Err(e) => warn!(channel = ch.name(), error = %e, "notification failed; dropped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Failing(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Notifier for Failing {
        async fn send(&self, _n: &Notification) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("down")
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn failures_are_swallowed_and_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::default()
            .with(Box::new(Failing(hits.clone())))
            .with(Box::new(Failing(hits.clone())));
        mux.notify(&Notification::system("hello")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_link_has_no_click_url() {
        let n = Notification::alert("m", "", "BBC", None);
        assert_eq!(n.click_url, None);
        assert_eq!(Notification::system("x").source_label, "System");
    }
}
