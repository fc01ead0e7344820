use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use klaxon_core::config::WebhookChannelConfig;
use klaxon_core::errors::DeliveryError;
use klaxon_core::events::NotificationEvent;

use crate::channel::Channel;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-webhook delivery (Slack-style post API: bearer token, JSON body,
/// `{"ok": bool}` acknowledgement).
pub struct WebhookChannel {
    client: Client,
    url: String,
    token: SecretString,
    channel: String,
}

impl WebhookChannel {
    pub fn from_config(config: &WebhookChannelConfig) -> Result<Self, DeliveryError> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| DeliveryError::Auth("webhook token not configured".into()))?;
        Ok(Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .map_err(|e| DeliveryError::Network(e.to_string()))?,
            url: config.url.clone(),
            token,
            channel: config.channel.clone(),
        })
    }

    fn check_ack(body: &serde_json::Value) -> Result<(), DeliveryError> {
        match body.get("ok").and_then(serde_json::Value::as_bool) {
            Some(true) => Ok(()),
            Some(false) => {
                let reason = body
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown");
                if reason == "invalid_auth" || reason == "token_revoked" {
                    Err(DeliveryError::Auth(reason.to_string()))
                } else {
                    Err(DeliveryError::MalformedResponse(reason.to_string()))
                }
            }
            None => Err(DeliveryError::MalformedResponse(
                "missing \"ok\" field in acknowledgement".into(),
            )),
        }
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn id(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "channel": self.channel,
            "text": event.summary_line(),
        });

        let resp = self
            .client
            .post(&self.url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::from_status(status, body));
        }

        let ack: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| DeliveryError::MalformedResponse(e.to_string()))?;
        Self::check_ack(&ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebhookChannelConfig {
        WebhookChannelConfig {
            enabled: true,
            url: "https://chat.example.com/api/post".into(),
            token: Some(SecretString::from("xoxb-test")),
            channel: "#trading-alerts".into(),
        }
    }

    #[test]
    fn builds_from_config() {
        let channel = WebhookChannel::from_config(&config()).unwrap();
        assert_eq!(channel.id(), "webhook");
        assert_eq!(channel.channel, "#trading-alerts");
    }

    #[test]
    fn missing_token_is_auth_error() {
        let mut config = config();
        config.token = None;
        assert!(matches!(
            WebhookChannel::from_config(&config),
            Err(DeliveryError::Auth(_))
        ));
    }

    #[test]
    fn ack_ok_true_accepted() {
        let ack = serde_json::json!({"ok": true});
        assert!(WebhookChannel::check_ack(&ack).is_ok());
    }

    #[test]
    fn ack_invalid_auth_maps_to_auth() {
        let ack = serde_json::json!({"ok": false, "error": "invalid_auth"});
        assert!(matches!(
            WebhookChannel::check_ack(&ack),
            Err(DeliveryError::Auth(_))
        ));
    }

    #[test]
    fn ack_other_failure_is_malformed() {
        let ack = serde_json::json!({"ok": false, "error": "channel_not_found"});
        assert!(matches!(
            WebhookChannel::check_ack(&ack),
            Err(DeliveryError::MalformedResponse(_))
        ));
    }

    #[test]
    fn ack_missing_ok_is_malformed() {
        let ack = serde_json::json!({"posted": true});
        assert!(matches!(
            WebhookChannel::check_ack(&ack),
            Err(DeliveryError::MalformedResponse(_))
        ));
    }
}
