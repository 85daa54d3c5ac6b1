//! Generic HTTP webhook notifier.
//!
//! Posts the machine-readable report (`Notification::payload`) as JSON.

use crate::traits::{Notification, Notifier, NotifyError};

/// Delivers reports as JSON over HTTP POST.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::Config(format!("webhook URL must be http(s): {url}")));
        }
        Ok(Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Turn a non-2xx response into an error carrying the response body.
pub(crate) async fn check_status(
    channel: &str,
    url: &str,
    response: reqwest::Response,
) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body_text = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    tracing::warn!(channel, url, %status, body = %body_text, "endpoint returned non-2xx status");
    Err(NotifyError::Config(format!("{channel} returned {status}: {body_text}")))
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&notification.payload)
            .send()
            .await?;
        check_status("webhook", &self.url, response).await?;

        tracing::debug!(url = %self.url, "webhook notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
