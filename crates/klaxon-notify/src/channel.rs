use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use klaxon_core::errors::DeliveryError;
use klaxon_core::events::NotificationEvent;

/// A delivery target. Implementations perform one delivery attempt; the
/// dispatcher owns timeouts, retries, and result aggregation, so new
/// channels plug in without touching its control flow.
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> &str;

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError>;
}

/// Outcome of one channel's delivery of one event. Returned to the caller
/// for observability; not persisted.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelResult {
    pub channel_id: String,
    pub success: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error_kind"
    )]
    pub error: Option<DeliveryError>,
    pub attempted_at: DateTime<Utc>,
    pub attempts: u32,
}

fn serialize_error_kind<S: Serializer>(
    error: &Option<DeliveryError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(e.error_kind()),
        None => serializer.serialize_none(),
    }
}

impl ChannelResult {
    pub fn ok(channel_id: &str, attempts: u32) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            success: true,
            error: None,
            attempted_at: Utc::now(),
            attempts,
        }
    }

    pub fn failed(channel_id: &str, error: DeliveryError, attempts: u32) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            success: false,
            error: Some(error),
            attempted_at: Utc::now(),
            attempts,
        }
    }
}
