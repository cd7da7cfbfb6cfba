use anyhow::{Context, Result};
use reqwest::Client;

use super::{Notification, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }

    pub fn render(n: &Notification) -> String {
        match &n.click_url {
            Some(link) => format!("*{}*: {}\n<{}>", n.source_label, n.message, link),
            None => format!("*{}*: {}", n.source_label, n.message),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let body = serde_json::json!({ "text": Self::render(n) });

        self.client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_includes_link_when_present() {
        let n = Notification::alert("Quake", "https://x/1", "BBC", None);
        assert_eq!(SlackNotifier::render(&n), "*BBC*: Quake\n<https://x/1>");
        assert_eq!(
            SlackNotifier::render(&Notification::system("down")),
            "*System*: down"
        );
    }
}
