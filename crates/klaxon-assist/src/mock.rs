use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use klaxon_core::errors::AssistError;

use crate::client::{CompletionClient, CompletionRequest};

/// Pre-programmed replies for deterministic testing without API calls.
pub enum MockReply {
    /// Return this text as the assistant's reply.
    Text(String),
    /// Fail the call with this error.
    Error(AssistError),
    /// Wait a duration, then resolve with the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock completion client that consumes scripted replies in sequence.
pub struct MockCompletionClient {
    replies: Mutex<VecDeque<MockReply>>,
    call_count: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The most recent request, for asserting on the outbound payload.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AssistError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock() = Some(request.clone());

        let reply = self.replies.lock().pop_front().ok_or_else(|| {
            AssistError::MalformedResponse("MockCompletionClient: script exhausted".into())
        })?;

        let mut current = reply;
        loop {
            match current {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}
