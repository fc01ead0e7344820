use std::time::Duration;

/// Per-channel delivery failure. Produced by one channel's attempt and
/// recorded in its `ChannelResult`; never aborts sibling channels.
#[derive(Clone, Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl DeliveryError {
    /// Auth and malformed-response failures are terminal for this event —
    /// repeating the same request cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code from a channel endpoint.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            _ => Self::Network(format!("status {status}: {body}")),
        }
    }
}

/// Errors from the conversational path. Classifies errors as fatal
/// (configuration, caught at startup) or operational (per-call).
#[derive(Clone, Debug, thiserror::Error)]
pub enum AssistError {
    // Fatal — prevents the gateway from starting
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("configuration error: {0}")]
    Configuration(String),

    // Operational
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("malformed completion payload: {0}")]
    MalformedResponse(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl AssistError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Configuration(_))
    }

    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "missing_credential",
            Self::Configuration(_) => "configuration",
            Self::Upstream { .. } => "upstream",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classify a non-success HTTP status from the completion endpoint.
    pub fn from_status(status: u16, body: String) -> Self {
        Self::Upstream { status, body }
    }
}

/// Configuration validation failure. The only error class that should
/// prevent the subsystem from starting; never produced after startup.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("history capacity must be at least 1")]
    ZeroCapacity,
    #[error("channel {channel} is enabled but has no credential")]
    MissingCredential { channel: String },
    #[error("channel {channel} is enabled but has no endpoint")]
    MissingEndpoint { channel: String },
}
