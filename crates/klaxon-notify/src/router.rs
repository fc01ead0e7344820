use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use klaxon_core::config::NotifyConfig;
use klaxon_core::errors::ConfigError;
use klaxon_core::events::{NotificationEvent, Severity};
use klaxon_telemetry::MetricsRecorder;

use crate::backoff::RetryPolicy;
use crate::channel::{Channel, ChannelResult};
use crate::channels::{DesktopChannel, EmailChannel, WebhookChannel};
use crate::cooldown::CooldownGate;
use crate::dispatcher::ChannelDispatcher;
use crate::window::RateWindow;

/// Why an event was not dispatched. Suppressions are expected outcomes,
/// never errors.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    BelowThreshold,
    RateLimited,
    Cooldown,
}

/// Result of submitting one event.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Suppressed { reason: SuppressReason },
    Dispatched { results: Vec<ChannelResult> },
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

/// Public entry point of the notification path: severity threshold, then
/// the sliding rate window, then the per-category cooldown, then fan-out.
///
/// The rate limit is global and cheap, so it runs before the per-category
/// cooldown; under burst conditions most events never reach the cooldown
/// map. One router instance serializes its window behind a mutex and may
/// be shared across producer tasks.
pub struct NotificationRouter {
    min_level: Severity,
    window: Mutex<RateWindow>,
    gate: CooldownGate,
    dispatcher: ChannelDispatcher,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl NotificationRouter {
    /// Build a router from dashboard configuration. Disabled channels are
    /// never constructed, so they are skipped and omitted from results.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut channels: Vec<Arc<dyn Channel>> = Vec::new();
        if config.desktop.enabled {
            channels.push(Arc::new(DesktopChannel::new()));
        }
        if config.email.enabled {
            let channel = EmailChannel::from_config(&config.email).map_err(|_| {
                ConfigError::MissingCredential {
                    channel: "email".into(),
                }
            })?;
            channels.push(Arc::new(channel));
        }
        if config.webhook.enabled {
            let channel = WebhookChannel::from_config(&config.webhook).map_err(|_| {
                ConfigError::MissingCredential {
                    channel: "webhook".into(),
                }
            })?;
            channels.push(Arc::new(channel));
        }

        Ok(Self::new(
            config,
            ChannelDispatcher::new(
                channels,
                Duration::from_millis(config.channel_timeout_ms),
                RetryPolicy::from_config(&config.retry),
            ),
        ))
    }

    /// Build a router around an explicit dispatcher (test doubles, custom
    /// channel sets).
    pub fn new(config: &NotifyConfig, dispatcher: ChannelDispatcher) -> Self {
        Self {
            min_level: config.min_level,
            window: Mutex::new(RateWindow::new(
                Duration::from_secs(config.window_secs),
                config.max_per_window,
            )),
            gate: CooldownGate::new(Duration::from_secs(config.cooldown_secs)),
            dispatcher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Submit one event. Below-threshold, rate-limited, and cooling-down
    /// events return a structured suppression; admitted events fan out and
    /// return per-channel results.
    pub async fn submit(&self, event: NotificationEvent) -> DispatchOutcome {
        self.count("events_submitted", &[]);
        let now = Instant::now();

        if event.severity < self.min_level {
            debug!(event_id = %event.id, severity = event.severity.as_str(), "below threshold");
            return self.suppressed(SuppressReason::BelowThreshold);
        }

        if !self.window.lock().admit(event.severity, now) {
            debug!(event_id = %event.id, severity = event.severity.as_str(), "rate limited");
            return self.suppressed(SuppressReason::RateLimited);
        }

        if !self.gate.allow(&event.category, now) {
            debug!(event_id = %event.id, category = %event.category, "in cooldown");
            return self.suppressed(SuppressReason::Cooldown);
        }

        let results = self.dispatcher.dispatch(&event).await;
        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            event_id = %event.id,
            category = %event.category,
            channels = results.len(),
            failed = failed,
            "dispatched"
        );

        self.count("events_dispatched", &[]);
        if let Some(metrics) = &self.metrics {
            for result in results.iter().filter(|r| !r.success) {
                metrics.increment_counter(
                    "channel_failures",
                    &[("channel", result.channel_id.as_str())],
                    1,
                );
            }
        }

        DispatchOutcome::Dispatched { results }
    }

    fn suppressed(&self, reason: SuppressReason) -> DispatchOutcome {
        if let Some(metrics) = &self.metrics {
            let label = match reason {
                SuppressReason::BelowThreshold => "below_threshold",
                SuppressReason::RateLimited => "rate_limited",
                SuppressReason::Cooldown => "cooldown",
            };
            metrics.increment_counter("events_suppressed", &[("reason", label)], 1);
        }
        DispatchOutcome::Suppressed { reason }
    }

    fn count(&self, name: &str, labels: &[(&str, &str)]) {
        if let Some(metrics) = &self.metrics {
            metrics.increment_counter(name, labels, 1);
        }
    }
}
