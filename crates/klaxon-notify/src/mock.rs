use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use klaxon_core::errors::DeliveryError;
use klaxon_core::events::NotificationEvent;

use crate::channel::Channel;

/// Pre-programmed outcomes for deterministic testing without real delivery.
pub enum MockOutcome {
    /// The attempt succeeds.
    Ok,
    /// The attempt fails with this error.
    Error(DeliveryError),
    /// Wait a duration, then resolve with the inner outcome. Used to
    /// exercise dispatcher timeouts.
    Delay(Duration, Box<MockOutcome>),
}

impl MockOutcome {
    pub fn delayed(delay: Duration, inner: MockOutcome) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock channel that consumes scripted outcomes in order. Once the script
/// is exhausted, every further attempt succeeds.
pub struct MockChannel {
    id: String,
    script: Mutex<VecDeque<MockOutcome>>,
    attempts: AtomicUsize,
}

impl MockChannel {
    pub fn new(id: impl Into<String>, script: Vec<MockOutcome>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A channel that always succeeds.
    pub fn healthy(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    /// A channel that fails every attempt with a clone of `error`.
    pub fn failing(id: impl Into<String>, error: DeliveryError, times: usize) -> Self {
        Self::new(
            id,
            (0..times).map(|_| MockOutcome::Error(error.clone())).collect(),
        )
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn deliver(&self, _event: &NotificationEvent) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let outcome = self.script.lock().pop_front();
        let mut current = match outcome {
            Some(outcome) => outcome,
            None => return Ok(()),
        };

        loop {
            match current {
                MockOutcome::Ok => return Ok(()),
                MockOutcome::Error(e) => return Err(e),
                MockOutcome::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}
