use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{Notification, Notifier};

const DEFAULT_SERVER: &str = "https://ntfy.sh";

/// ntfy.sh topic publisher: message body as text, metadata in headers.
pub struct NtfyNotifier {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl NtfyNotifier {
    /// Enabled when NTFY_TOPIC is set; NTFY_SERVER overrides the public server.
    pub fn from_env() -> Option<Self> {
        let topic = std::env::var("NTFY_TOPIC").ok()?;
        let server = std::env::var("NTFY_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        Self::new(&server, &topic)
    }

    pub fn new(server: &str, topic: &str) -> Option<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }
        Some(Self {
            endpoint: format!("{}/{}", server.trim().trim_end_matches('/'), topic),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Header pairs sent with `n`.
    pub fn headers_for(n: &Notification) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Title", format!("Source: {}", n.source_label)),
            ("Priority", "default".to_string()),
        ];
        if let Some(click) = &n.click_url {
            headers.push(("Click", click.clone()));
        }
        if let Some(img) = &n.image_url {
            headers.push(("Attach", img.clone()));
        }
        headers
    }
}

#[async_trait::async_trait]
impl Notifier for NtfyNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .body(n.message.clone().into_bytes());
        for (k, v) in Self::headers_for(n) {
            req = req.header(k, v);
        }
        req.send()
            .await
            .context("ntfy post")?
            .error_for_status()
            .context("ntfy non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ntfy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_and_headers() {
        let n = NtfyNotifier::new("https://ntfy.example/", "news_topic").unwrap();
        assert_eq!(n.endpoint(), "https://ntfy.example/news_topic");
        assert!(NtfyNotifier::new(DEFAULT_SERVER, "  ").is_none());

        let note = Notification::alert(
            "🌊 Quake hits coast",
            "https://x/1",
            "BBC World",
            Some("https://img/q.jpg".into()),
        );
        let h = NtfyNotifier::headers_for(&note);
        assert!(h.contains(&("Title", "Source: BBC World".to_string())));
        assert!(h.contains(&("Click", "https://x/1".to_string())));
        assert!(h.contains(&("Attach", "https://img/q.jpg".to_string())));

        let sys = NtfyNotifier::headers_for(&Notification::system("down"));
        assert!(!sys.iter().any(|(k, _)| *k == "Click" || *k == "Attach"));
    }
}
