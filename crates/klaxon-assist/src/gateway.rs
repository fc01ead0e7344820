use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use klaxon_core::config::AssistConfig;
use klaxon_core::errors::AssistError;
use klaxon_core::messages::{Message, Role};

use crate::client::{CompletionClient, CompletionRequest, WireMessage};
use crate::history::SessionHistory;
use crate::http::HttpCompletionClient;

/// Conversational entry point: composes the system instruction with the
/// bounded session transcript and forwards to a completion backend.
///
/// The user message is appended before the upstream call and is never
/// rolled back — on failure or cancellation the transcript keeps it, so a
/// caller-driven retry sees the full exchange. One gateway owns one
/// session; independent sessions are independent instances.
pub struct AssistantGateway {
    client: Arc<dyn CompletionClient>,
    history: Mutex<SessionHistory>,
    system_instruction: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    request_timeout: Duration,
}

impl std::fmt::Debug for AssistantGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantGateway")
            .field("backend", &self.client.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AssistantGateway {
    /// Build a gateway with the HTTP completion backend. Fails fast with
    /// the configuration-error class when no credential is present.
    pub fn from_config(config: &AssistConfig) -> Result<Self, AssistError> {
        let client = HttpCompletionClient::from_config(config)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Build a gateway around an explicit backend (test doubles).
    pub fn with_client(
        config: &AssistConfig,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self, AssistError> {
        let history = SessionHistory::new(config.history_capacity)
            .map_err(|e| AssistError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            history: Mutex::new(history),
            system_instruction: config.system_instruction.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// The outbound payload is the fixed system instruction followed by the
    /// transcript snapshot (which already includes the new user message).
    /// The upstream call is bounded by the configured timeout and by the
    /// caller's cancellation token.
    pub async fn converse(
        &self,
        user_message: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<String, AssistError> {
        let request = {
            let mut history = self.history.lock();
            history.append(Role::User, user_message);

            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.push(WireMessage::system(&self.system_instruction));
            messages.extend(history.snapshot().iter().map(WireMessage::from));

            CompletionRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            }
        };

        let reply = tokio::select! {
            _ = cancel.cancelled() => Err(AssistError::Cancelled),
            outcome = tokio::time::timeout(self.request_timeout, self.client.complete(&request)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(AssistError::Timeout(self.request_timeout)),
                }
            }
        };

        match reply {
            Ok(text) => {
                self.history.lock().append(Role::Assistant, &text);
                debug!(backend = self.client.name(), "assistant replied");
                Ok(text)
            }
            Err(e) => {
                // The user message stays appended; nothing is silently lost.
                warn!(backend = self.client.name(), error = %e, "completion failed");
                Err(e)
            }
        }
    }

    /// The retained transcript in append order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.lock().snapshot()
    }

    /// Clear the transcript without resetting the index counter.
    pub fn reset(&self) {
        self.history.lock().reset();
    }
}
