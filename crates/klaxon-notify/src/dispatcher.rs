use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use klaxon_core::errors::DeliveryError;
use klaxon_core::events::NotificationEvent;

use crate::backoff::RetryPolicy;
use crate::channel::{Channel, ChannelResult};

/// Fans an admitted event out to the configured channels.
///
/// Channels run concurrently and are isolated from each other: one
/// channel's failure or slowness never affects a sibling's attempt. Every
/// attempt is bounded by `attempt_timeout`; retryable failures are retried
/// up to `retry.max_retries` times with backoff. Delivery is best-effort —
/// an event whose retries are exhausted is not requeued.
pub struct ChannelDispatcher {
    channels: Vec<Arc<dyn Channel>>,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

impl ChannelDispatcher {
    pub fn new(
        channels: Vec<Arc<dyn Channel>>,
        attempt_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            channels,
            attempt_timeout,
            retry,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver `event` to every channel. Results come back in configured
    /// channel order, one per channel.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Vec<ChannelResult> {
        let attempts = self
            .channels
            .iter()
            .map(|channel| self.deliver_with_retry(channel.as_ref(), event));
        join_all(attempts).await
    }

    async fn deliver_with_retry(
        &self,
        channel: &dyn Channel,
        event: &NotificationEvent,
    ) -> ChannelResult {
        let mut last_error: Option<DeliveryError> = None;

        for attempt in 0..=self.retry.max_retries {
            let outcome = tokio::time::timeout(self.attempt_timeout, channel.deliver(event)).await;
            let error = match outcome {
                Ok(Ok(())) => {
                    debug!(
                        channel = channel.id(),
                        event_id = %event.id,
                        attempt = attempt + 1,
                        "delivered"
                    );
                    return ChannelResult::ok(channel.id(), attempt + 1);
                }
                Ok(Err(e)) => e,
                Err(_) => DeliveryError::Timeout(self.attempt_timeout),
            };

            if !error.is_retryable() || attempt == self.retry.max_retries {
                warn!(
                    channel = channel.id(),
                    event_id = %event.id,
                    attempts = attempt + 1,
                    error = %error,
                    "delivery failed"
                );
                return ChannelResult::failed(channel.id(), error, attempt + 1);
            }

            let delay = self.retry.delay_for(attempt);
            debug!(
                channel = channel.id(),
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying delivery"
            );
            last_error = Some(error);
            tokio::time::sleep(delay).await;
        }

        // Unreachable: the loop always returns on the final attempt.
        let error = last_error.unwrap_or(DeliveryError::Network("retries exhausted".into()));
        ChannelResult::failed(channel.id(), error, self.retry.max_retries + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChannel, MockOutcome};
    use klaxon_core::events::Severity;

    fn event() -> NotificationEvent {
        NotificationEvent::new(Severity::Error, "drawdown", "Drawdown", "BTC -8.2%")
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn all_healthy_channels_succeed() {
        let dispatcher = ChannelDispatcher::new(
            vec![
                Arc::new(MockChannel::healthy("desktop")),
                Arc::new(MockChannel::healthy("email")),
                Arc::new(MockChannel::healthy("webhook")),
            ],
            Duration::from_secs(1),
            policy(2),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.success));
        // Configured order is preserved.
        let ids: Vec<_> = results.iter().map(|r| r.channel_id.as_str()).collect();
        assert_eq!(ids, ["desktop", "email", "webhook"]);
    }

    #[tokio::test]
    async fn failing_channel_does_not_affect_siblings() {
        let dispatcher = ChannelDispatcher::new(
            vec![
                Arc::new(MockChannel::healthy("desktop")),
                Arc::new(MockChannel::failing(
                    "webhook",
                    DeliveryError::Auth("revoked".into()),
                    10,
                )),
                Arc::new(MockChannel::healthy("email")),
            ],
            Duration::from_secs(1),
            policy(1),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
    }

    #[tokio::test]
    async fn retryable_failure_retries_then_succeeds() {
        let channel = Arc::new(MockChannel::failing(
            "webhook",
            DeliveryError::Network("503".into()),
            2,
        ));
        let dispatcher = ChannelDispatcher::new(
            vec![channel.clone()],
            Duration::from_secs(1),
            policy(3),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert!(results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert_eq!(channel.attempts(), 3);
    }

    #[tokio::test]
    async fn terminal_error_not_retried() {
        let channel = Arc::new(MockChannel::failing(
            "webhook",
            DeliveryError::Auth("invalid_auth".into()),
            10,
        ));
        let dispatcher = ChannelDispatcher::new(
            vec![channel.clone()],
            Duration::from_secs(1),
            policy(3),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 1);
        assert_eq!(channel.attempts(), 1);
    }

    #[tokio::test]
    async fn retries_exhausted_marks_failed() {
        let channel = Arc::new(MockChannel::failing(
            "email",
            DeliveryError::Network("down".into()),
            10,
        ));
        let dispatcher = ChannelDispatcher::new(
            vec![channel.clone()],
            Duration::from_secs(1),
            policy(2),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert!(!results[0].success);
        assert_eq!(results[0].attempts, 3);
        assert!(matches!(results[0].error, Some(DeliveryError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_channel_times_out_without_blocking_siblings() {
        let dispatcher = ChannelDispatcher::new(
            vec![
                Arc::new(MockChannel::new(
                    "slow",
                    vec![MockOutcome::delayed(Duration::from_secs(300), MockOutcome::Ok)],
                )),
                Arc::new(MockChannel::healthy("fast")),
            ],
            Duration::from_secs(5),
            policy(0),
        );

        let results = dispatcher.dispatch(&event()).await;
        assert!(!results[0].success);
        assert!(matches!(results[0].error, Some(DeliveryError::Timeout(_))));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn empty_channel_set_yields_no_results() {
        let dispatcher =
            ChannelDispatcher::new(Vec::new(), Duration::from_secs(1), policy(0));
        let results = dispatcher.dispatch(&event()).await;
        assert!(results.is_empty());
    }
}
