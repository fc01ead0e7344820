use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use klaxon_core::config::AssistConfig;
use klaxon_core::errors::AssistError;

use crate::client::{CompletionClient, CompletionRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Completion client over an OpenAI-style chat completions endpoint.
#[derive(Debug)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl HttpCompletionClient {
    /// Fails with `MissingCredential` when no API key is configured — the
    /// one error class that must surface at startup, not per call.
    pub fn from_config(config: &AssistConfig) -> Result<Self, AssistError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AssistError::MissingCredential("assist.api_key".into()))?;
        Ok(Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .map_err(|e| AssistError::Network(e.to_string()))?,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

/// Extract the first choice's message content from a completion payload.
/// Any other shape — no choices, missing message, non-string content — is
/// a malformed upstream response, including truncated partial successes.
fn parse_reply(payload: &serde_json::Value) -> Result<String, AssistError> {
    payload
        .get("choices")
        .and_then(serde_json::Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AssistError::MalformedResponse("expected choices[0].message.content".into())
        })
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AssistError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(request)
            .send()
            .await
            .map_err(|e| AssistError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AssistError::from_status(status, body));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AssistError::MalformedResponse(e.to_string()))?;
        parse_reply(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_fails_at_construction() {
        let config = AssistConfig {
            api_key: None,
            ..Default::default()
        };
        let err = HttpCompletionClient::from_config(&config).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, AssistError::MissingCredential(_)));
    }

    #[test]
    fn configured_key_builds_client() {
        let config = AssistConfig {
            api_key: Some(SecretString::from("sk-test")),
            ..Default::default()
        };
        let client = HttpCompletionClient::from_config(&config).unwrap();
        assert_eq!(client.name(), "http");
    }

    #[test]
    fn parse_reply_happy_path() {
        let payload = serde_json::json!({
            "choices": [{"message": {"content": "Your BTC exposure is 12%."}}]
        });
        assert_eq!(
            parse_reply(&payload).unwrap(),
            "Your BTC exposure is 12%."
        );
    }

    #[test]
    fn parse_reply_uses_first_choice() {
        let payload = serde_json::json!({
            "choices": [
                {"message": {"content": "first"}},
                {"message": {"content": "second"}}
            ]
        });
        assert_eq!(parse_reply(&payload).unwrap(), "first");
    }

    #[test]
    fn empty_choices_is_malformed() {
        let payload = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_reply(&payload),
            Err(AssistError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_content_is_malformed() {
        let payload = serde_json::json!({"choices": [{"message": {"role": "assistant"}}]});
        assert!(matches!(
            parse_reply(&payload),
            Err(AssistError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let payload = serde_json::json!("oops");
        assert!(matches!(
            parse_reply(&payload),
            Err(AssistError::MalformedResponse(_))
        ));
    }
}
