use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::ConfigError;
use crate::events::Severity;

/// Top-level configuration, supplied by the dashboard layer as JSON.
/// This core consumes it; it does not own or persist it.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct KlaxonConfig {
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub assist: AssistConfig,
}

impl KlaxonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notify.validate()?;
        self.assist.validate()
    }
}

/// Notification path configuration: threshold, rate limit, cooldown, and
/// per-channel settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub min_level: Severity,
    pub max_per_window: u32,
    /// Sliding-window length in seconds. 0 disables rate limiting.
    pub window_secs: u64,
    /// Per-category cooldown in seconds. 0 disables suppression.
    pub cooldown_secs: u64,
    /// Per-attempt channel delivery timeout.
    pub channel_timeout_ms: u64,
    pub retry: RetryConfig,
    pub desktop: DesktopChannelConfig,
    pub email: EmailChannelConfig,
    pub webhook: WebhookChannelConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            min_level: Severity::Warning,
            max_per_window: 5,
            window_secs: 300,
            cooldown_secs: 600,
            channel_timeout_ms: 10_000,
            retry: RetryConfig::default(),
            desktop: DesktopChannelConfig::default(),
            email: EmailChannelConfig::default(),
            webhook: WebhookChannelConfig::default(),
        }
    }
}

impl NotifyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.email.validate()?;
        self.webhook.validate()
    }
}

/// Retry behavior shared by all channels.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct DesktopChannelConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct EmailChannelConfig {
    pub enabled: bool,
    /// Mail API endpoint (HTTP send endpoint, not SMTP).
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub from: String,
    pub to: String,
}

impl EmailChannelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint {
                channel: "email".into(),
            });
        }
        if self.api_key.is_none() {
            return Err(ConfigError::MissingCredential {
                channel: "email".into(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct WebhookChannelConfig {
    pub enabled: bool,
    pub url: String,
    pub token: Option<SecretString>,
    /// Destination channel identifier understood by the chat service.
    pub channel: String,
}

impl WebhookChannelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.url.is_empty() {
            return Err(ConfigError::MissingEndpoint {
                channel: "webhook".into(),
            });
        }
        if self.token.is_none() {
            return Err(ConfigError::MissingCredential {
                channel: "webhook".into(),
            });
        }
        Ok(())
    }
}

/// Conversational path configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Bounded transcript capacity (most-recent non-system messages).
    pub history_capacity: usize,
    pub system_instruction: String,
    pub request_timeout_ms: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: 512,
            history_capacity: 10,
            system_instruction: "You are the trading desk assistant. Answer concisely using \
                                 the portfolio context provided by the dashboard."
                .into(),
            request_timeout_ms: 30_000,
        }
    }
}

impl AssistConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = KlaxonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.assist.history_capacity, 10);
        assert_eq!(config.notify.min_level, Severity::Warning);
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = AssistConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn enabled_webhook_requires_token() {
        let config = NotifyConfig {
            webhook: WebhookChannelConfig {
                enabled: true,
                url: "https://chat.example.com/api/post".into(),
                token: None,
                channel: "#alerts".into(),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn enabled_email_requires_endpoint() {
        let config = NotifyConfig {
            email: EmailChannelConfig {
                enabled: true,
                endpoint: String::new(),
                api_key: Some(SecretString::from("key")),
                from: "bot@example.com".into(),
                to: "ops@example.com".into(),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEndpoint { .. })
        ));
    }

    #[test]
    fn disabled_channels_skip_validation() {
        // Disabled channels may be partially configured.
        let config = NotifyConfig::default();
        assert!(!config.webhook.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_from_dashboard_json() {
        let json = r##"{
            "notify": {
                "min_level": "error",
                "max_per_window": 3,
                "window_secs": 60,
                "cooldown_secs": 120,
                "webhook": {
                    "enabled": true,
                    "url": "https://chat.example.com/api/post",
                    "token": "xoxb-secret",
                    "channel": "#trading-alerts"
                }
            },
            "assist": {
                "model": "gpt-4o",
                "history_capacity": 20
            }
        }"##;
        let config: KlaxonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.notify.min_level, Severity::Error);
        assert_eq!(config.notify.max_per_window, 3);
        assert!(config.notify.webhook.enabled);
        assert_eq!(config.assist.history_capacity, 20);
        assert!(config.validate().is_ok());
    }
}
