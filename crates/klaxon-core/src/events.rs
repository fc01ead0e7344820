use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EventId;

/// Severity classes for alert events, ordered least to most urgent.
/// The derived `Ord` makes threshold checks a plain comparison.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Stable label for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

/// Renderable content of an alert. Channels decide how to present it
/// (toast title/body, mail subject/text, webhook message line).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub body: String,
}

/// A single alert event. Immutable once created; consumed exactly once by
/// the router and not persisted by this core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: EventId,
    pub severity: Severity,
    pub category: String,
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            severity,
            category: category.into(),
            payload: EventPayload {
                title: title.into(),
                body: body.into(),
            },
            created_at: Utc::now(),
        }
    }

    /// One-line rendering used by text-oriented channels.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.severity.as_str().to_uppercase(),
            self.payload.title,
            self.payload.body
        )
    }
}
