use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use klaxon_core::config::EmailChannelConfig;
use klaxon_core::errors::DeliveryError;
use klaxon_core::events::NotificationEvent;

use crate::channel::Channel;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Email delivery through an HTTP mail API (send endpoint, bearer auth).
pub struct EmailChannel {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    from: String,
    to: String,
}

impl EmailChannel {
    /// Callers must have validated the config first; a missing key here is
    /// a programming error surfaced as `Auth` rather than a panic.
    pub fn from_config(config: &EmailChannelConfig) -> Result<Self, DeliveryError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DeliveryError::Auth("email api_key not configured".into()))?;
        Ok(Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .map_err(|e| DeliveryError::Network(e.to_string()))?,
            endpoint: config.endpoint.clone(),
            api_key,
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn id(&self) -> &str {
        "email"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "from": self.from,
            "to": self.to,
            "subject": format!("[{}] {}", event.severity.as_str().to_uppercase(), event.payload.title),
            "text": event.payload.body,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
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

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailChannelConfig {
        EmailChannelConfig {
            enabled: true,
            endpoint: "https://mail.example.com/v1/send".into(),
            api_key: Some(SecretString::from("mk-test")),
            from: "bot@example.com".into(),
            to: "ops@example.com".into(),
        }
    }

    #[test]
    fn builds_from_config() {
        let channel = EmailChannel::from_config(&config()).unwrap();
        assert_eq!(channel.id(), "email");
        assert_eq!(channel.to, "ops@example.com");
    }

    #[test]
    fn missing_key_is_auth_error() {
        let mut config = config();
        config.api_key = None;
        assert!(matches!(
            EmailChannel::from_config(&config),
            Err(DeliveryError::Auth(_))
        ));
    }
}
