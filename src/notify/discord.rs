use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Notification, Notifier};

/// Discord webhook channel: one embed per alert, single attempt.
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let payload = DiscordWebhookPayload::from_notification(n);
        let rsp = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;
        rsp.error_for_status_ref()
            .map_err(|e| anyhow!("Discord webhook HTTP error: {e}"))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct DiscordImage {
    url: String,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<DiscordImage>,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn from_notification(n: &Notification) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: format!("Source: {}", n.source_label),
                description: n.message.clone(),
                url: n.click_url.clone(),
                image: n.image_url.clone().map(|url| DiscordImage { url }),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_carries_link_and_image() {
        let n = Notification::alert("msg", "https://x/1", "DW", Some("https://i/1.png".into()));
        let v = serde_json::to_value(DiscordWebhookPayload::from_notification(&n)).unwrap();
        assert_eq!(v["embeds"][0]["title"], "Source: DW");
        assert_eq!(v["embeds"][0]["url"], "https://x/1");
        assert_eq!(v["embeds"][0]["image"]["url"], "https://i/1.png");

        let sys = serde_json::to_value(DiscordWebhookPayload::from_notification(
            &Notification::system("down"),
        ))
        .unwrap();
        assert!(sys["embeds"][0].get("url").is_none());
    }
}
