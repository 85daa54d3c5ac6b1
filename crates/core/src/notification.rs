use serde::{Deserialize, Serialize};

/// Where workflow reports are delivered. Addresses and URLs are not validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_webhook: Option<String>,
}

impl NotificationConfig {
    /// Drop empty strings so "" behaves like an unset channel.
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }
        Self {
            email: keep(self.email),
            webhook_url: keep(self.webhook_url),
            slack_webhook: keep(self.slack_webhook),
        }
    }

    /// Overlay `update` on these settings. Fields absent from `update` keep
    /// their current value; a blank string clears the channel.
    pub fn merged(self, update: NotificationConfig) -> Self {
        Self {
            email: update.email.or(self.email),
            webhook_url: update.webhook_url.or(self.webhook_url),
            slack_webhook: update.slack_webhook.or(self.slack_webhook),
        }
        .normalized()
    }

    /// Which channels are set, without revealing their values.
    pub fn masked(&self) -> MaskedNotificationConfig {
        fn mask(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "configured"
            } else {
                "not set"
            }
        }
        MaskedNotificationConfig {
            email: mask(&self.email),
            webhook_url: mask(&self.webhook_url),
            slack_webhook: mask(&self.slack_webhook),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedNotificationConfig {
    pub email: &'static str,
    pub webhook_url: &'static str,
    pub slack_webhook: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_with_missing_fields() {
        let cfg: NotificationConfig =
            serde_json::from_str(r#"{"webhookUrl":"https://hooks.example.com/x"}"#).unwrap();
        assert_eq!(cfg.webhook_url.as_deref(), Some("https://hooks.example.com/x"));
        assert!(cfg.email.is_none());
        assert!(cfg.slack_webhook.is_none());
    }

    #[test]
    fn normalized_drops_blank_values() {
        let cfg = NotificationConfig {
            email: Some("  ".into()),
            webhook_url: Some("https://x".into()),
            slack_webhook: Some(String::new()),
        }
        .normalized();
        assert!(cfg.email.is_none());
        assert!(cfg.slack_webhook.is_none());
        assert!(cfg.webhook_url.is_some());
    }

    #[test]
    fn merged_keeps_absent_fields_and_clears_blank_ones() {
        let current = NotificationConfig {
            email: Some("ops@example.com".into()),
            webhook_url: Some("https://hooks.example.com/old".into()),
            slack_webhook: None,
        };
        let update: NotificationConfig = serde_json::from_str(
            r#"{"webhookUrl":"","slackWebhook":"https://hooks.slack.com/services/T/B/X"}"#,
        )
        .unwrap();
        let merged = current.merged(update);
        assert_eq!(merged.email.as_deref(), Some("ops@example.com"));
        assert!(merged.webhook_url.is_none());
        assert!(merged.slack_webhook.is_some());
    }

    #[test]
    fn masked_hides_values() {
        let cfg = NotificationConfig {
            email: Some("ops@example.com".into()),
            ..Default::default()
        };
        let masked = serde_json::to_value(cfg.masked()).unwrap();
        assert_eq!(masked["email"], "configured");
        assert_eq!(masked["webhookUrl"], "not set");
        assert_eq!(masked["slackWebhook"], "not set");
    }
}
