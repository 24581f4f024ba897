//! Notification transport selection.

use std::time::Duration;

use fleetwatch_core::NotificationConfig;
use fleetwatch_sync::{LogNotifier, Notifier, NotifyError};

/// POSTs `{"subject": …, "message": …}` as JSON to a fixed URL.
pub struct WebhookNotifier {
    url: String,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(15))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn publish(&self, message: &str, subject: &str) -> Result<(), NotifyError> {
        self.agent
            .post(&self.url)
            .set("User-Agent", concat!("fleetwatch/", env!("CARGO_PKG_VERSION")))
            .send_json(serde_json::json!({ "subject": subject, "message": message }))
            .map_err(|e| NotifyError::Transport(format!("POST {}: {e}", self.url)))?;
        tracing::debug!("sent '{subject}' notification to {}", self.url);
        Ok(())
    }
}

/// Webhook when enabled and configured, otherwise log only.
pub fn from_config(config: &NotificationConfig) -> Box<dyn Notifier> {
    match (&config.webhook, config.enabled) {
        (Some(webhook), true) => Box::new(WebhookNotifier::new(&webhook.url)),
        (None, true) => {
            tracing::warn!("notifications enabled but no webhook configured, logging only");
            Box::new(LogNotifier)
        }
        (_, false) => Box::new(LogNotifier),
    }
}

/// Name of the machine fleetwatch runs on, for notification text.
pub fn local_hostname() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            tracing::warn!("could not determine local hostname: {e}");
            "unknown".to_string()
        })
}
