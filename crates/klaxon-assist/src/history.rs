use std::collections::VecDeque;

use klaxon_core::errors::ConfigError;
use klaxon_core::messages::{Message, Role};

/// Bounded, ordered transcript of role-tagged messages.
///
/// Holds at most `capacity` messages, evicting strictly FIFO. Indices are
/// monotonic and survive `reset`, so they stay globally unique for the
/// process lifetime. The system instruction is never stored here — the
/// gateway injects it at call time.
pub struct SessionHistory {
    messages: VecDeque<Message>,
    capacity: usize,
    next_index: u64,
}

impl SessionHistory {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            messages: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_index: 0,
        })
    }

    /// Append a message and return its index. Evicts from the front while
    /// the length exceeds capacity; the just-appended message is never
    /// evicted (capacity >= 1 is guaranteed by the constructor).
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        self.messages.push_back(Message::new(role, content, index));
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        index
    }

    /// The retained messages in append order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Clear the transcript. The index counter is deliberately left
    /// running so indices stay unique across resets.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_config_error() {
        assert!(matches!(
            SessionHistory::new(0),
            Err(ConfigError::ZeroCapacity)
        ));
    }

    #[test]
    fn append_assigns_monotonic_indices() {
        let mut history = SessionHistory::new(5).unwrap();
        assert_eq!(history.append(Role::User, "a"), 0);
        assert_eq!(history.append(Role::Assistant, "b"), 1);
        assert_eq!(history.append(Role::User, "c"), 2);
    }

    #[test]
    fn evicts_fifo_beyond_capacity() {
        let mut history = SessionHistory::new(3).unwrap();
        for i in 0..5 {
            history.append(Role::User, format!("m{i}"));
        }
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].content, "m2");
        assert_eq!(snapshot[2].content, "m4");
        assert_eq!(snapshot[0].index, 2);
    }

    #[test]
    fn capacity_ten_with_twelve_alternating_appends() {
        let mut history = SessionHistory::new(10).unwrap();
        for i in 0..6 {
            history.append(Role::User, format!("q{i}"));
            history.append(Role::Assistant, format!("a{i}"));
        }
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 10);
        // Oldest two (q0, a0) evicted; order preserved.
        assert_eq!(snapshot[0].content, "q1");
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[9].content, "a5");
        let indices: Vec<u64> = snapshot.iter().map(|m| m.index).collect();
        assert_eq!(indices, (2..12).collect::<Vec<u64>>());
    }

    #[test]
    fn reset_clears_but_keeps_index_counter() {
        let mut history = SessionHistory::new(4).unwrap();
        history.append(Role::User, "a");
        history.append(Role::Assistant, "b");
        history.reset();

        assert!(history.snapshot().is_empty());
        assert!(history.is_empty());
        // Next index is strictly greater than any previously issued.
        assert_eq!(history.append(Role::User, "c"), 2);
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let mut history = SessionHistory::new(1).unwrap();
        history.append(Role::User, "first");
        history.append(Role::Assistant, "second");
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "second");
    }
}
