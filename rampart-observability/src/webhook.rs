//! Webhook notification delivery — true no-op when disabled.
//!
//! When `enabled = false` (or no URL is configured), no channel or task is
//! created and `notify()` returns immediately. When enabled, messages go
//! through a bounded channel to a background task; a full channel drops the
//! message rather than blocking the pipeline.

use crate::sink::{NotifySink, Severity};
use chrono::Utc;
use rampart_core::config::WebhookConfig;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub struct WebhookSink {
    sender: Option<mpsc::Sender<(Severity, String)>>,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> Self {
        if !config.enabled || config.url.is_empty() {
            return Self { sender: None };
        }

        let (tx, rx) = mpsc::channel(1_000);
        tokio::spawn(Self::deliver_loop(config, rx));
        Self { sender: Some(tx) }
    }

    /// No-op constructor for disabled delivery.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    async fn deliver_loop(config: WebhookConfig, mut rx: mpsc::Receiver<(Severity, String)>) {
        let client = reqwest::Client::new();
        while let Some((severity, message)) = rx.recv().await {
            Self::deliver(&client, &config, severity, &message).await;
        }
    }

    async fn deliver(
        client: &reqwest::Client,
        config: &WebhookConfig,
        severity: Severity,
        message: &str,
    ) {
        let payload = json!({
            "embeds": [{
                "title": format!("{} {}: {}", severity.emoji(), config.server_id, severity.label()),
                "description": message,
                "color": severity.color(),
                "timestamp": Utc::now().to_rfc3339(),
            }],
        });

        match client.post(&config.url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(severity = severity.label(), "Webhook delivered");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Webhook delivery rejected");
            }
            Err(e) => {
                error!(error = %e, "Webhook delivery failed");
            }
        }
    }
}

impl NotifySink for WebhookSink {
    fn notify(&self, severity: Severity, message: &str) {
        if let Some(ref sender) = self.sender {
            let _ = sender.try_send((severity, message.to_string()));
        }
    }
}
