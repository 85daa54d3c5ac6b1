//! Slack incoming-webhook notifier.

use crate::traits::{Notification, Notifier, NotifyError};
use crate::webhook::check_status;

/// Posts the plain-text summary to a Slack incoming webhook.
#[derive(Debug)]
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> Result<Self, NotifyError> {
        let webhook_url = webhook_url.trim();
        if !webhook_url.starts_with("https://") {
            return Err(NotifyError::Config(
                "Slack webhook URL must use https".to_string(),
            ));
        }
        Ok(Self {
            webhook_url: webhook_url.to_string(),
            client: reqwest::Client::new(),
        })
    }
}

/// Slack message body: the subject in bold, then the summary.
pub fn slack_payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "text": format!("*{}*\n{}", notification.subject, notification.text),
    })
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&slack_payload(notification))
            .send()
            .await?;
        check_status("slack", &self.webhook_url, response).await?;

        tracing::info!(channel = "slack", subject = %notification.subject, "notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "slack"
    }
}
