use async_trait::async_trait;
use serde::Serialize;

use klaxon_core::errors::AssistError;
use klaxon_core::messages::{Message, Role};

/// A message as the completion endpoint expects it: role + content only,
/// no transcript index.
#[derive(Clone, Debug, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Outbound completion request body.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Trait implemented by completion backends (HTTP endpoint, test mock).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &str;

    /// Perform one completion call and return the assistant's reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AssistError>;
}
