use async_trait::async_trait;

use klaxon_core::errors::DeliveryError;
use klaxon_core::events::{NotificationEvent, Severity};

use crate::channel::Channel;

/// Desktop toast delivery via the OS notification daemon.
///
/// The notify-rust call is blocking, so it runs on the blocking pool. The
/// dispatcher's per-attempt timeout still applies from the outside.
pub struct DesktopChannel;

impl DesktopChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for DesktopChannel {
    fn id(&self) -> &str {
        "desktop"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let summary = event.payload.title.clone();
        let body = event.payload.body.clone();
        let urgency = match event.severity {
            Severity::Info => notify_rust::Urgency::Low,
            Severity::Warning => notify_rust::Urgency::Normal,
            Severity::Error | Severity::Critical => notify_rust::Urgency::Critical,
        };

        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&summary)
                .body(&body)
                .urgency(urgency)
                .show()
                .map(|_| ())
                .map_err(|e| DeliveryError::Network(e.to_string()))
        })
        .await
        .map_err(|e| DeliveryError::Network(format!("notification task panicked: {e}")))?
    }
}
