//! Routes a rendered report to every configured channel.
//!
//! Individual channel failures are logged and reported in the returned
//! [`DispatchResult`]s; they never stop delivery to the other channels.

use std::time::Instant;

use caseflow_core::config::SmtpConfig;
use caseflow_core::NotificationConfig;

use crate::email::EmailNotifier;
use crate::slack::SlackNotifier;
use crate::traits::{DispatchResult, Notification, Notifier};
use crate::webhook::WebhookNotifier;

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn with_channels(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Build channels from the user's notification settings.
    ///
    /// Email is only added when SMTP is configured and a recipient is set.
    /// A channel that cannot be built is skipped with a warning.
    pub fn from_settings(settings: &NotificationConfig, smtp: &SmtpConfig) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if let Some(ref recipients) = settings.email {
            match EmailNotifier::from_smtp(smtp, recipients) {
                Ok(Some(email)) => channels.push(Box::new(email)),
                Ok(None) => tracing::debug!("email recipient set but SMTP is not configured"),
                Err(e) => tracing::warn!(channel = "email", error = %e, "skipping channel"),
            }
        }

        if let Some(ref url) = settings.webhook_url {
            match WebhookNotifier::new(url) {
                Ok(webhook) => channels.push(Box::new(webhook)),
                Err(e) => tracing::warn!(channel = "webhook", error = %e, "skipping channel"),
            }
        }

        if let Some(ref url) = settings.slack_webhook {
            match SlackNotifier::new(url) {
                Ok(slack) => channels.push(Box::new(slack)),
                Err(e) => tracing::warn!(channel = "slack", error = %e, "skipping channel"),
            }
        }

        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    /// Deliver a report for `workflow` to all channels, in order.
    pub async fn dispatch(&self, workflow: &str, notification: &Notification) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(workflow, "No notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = Instant::now();
            let result = channel.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        workflow,
                        channel = channel.channel_name(),
                        duration_ms,
                        "Notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        workflow,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                workflow: workflow.to_string(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}
