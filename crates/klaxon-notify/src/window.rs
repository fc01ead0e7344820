use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use klaxon_core::events::Severity;

/// Sliding-window admission counter, tracked per severity class.
///
/// Retains the timestamps of admitted events within the trailing window and
/// prunes lazily on each admission check. The old edge is exclusive: an
/// admission exactly `window` old no longer counts against the limit.
pub struct RateWindow {
    window: Duration,
    max_per_window: u32,
    admitted: HashMap<Severity, VecDeque<Instant>>,
}

impl RateWindow {
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            window,
            max_per_window,
            admitted: HashMap::new(),
        }
    }

    /// Admit or reject an event of the given severity at `now`.
    /// Records `now` iff admitted. A zero window disables limiting.
    pub fn admit(&mut self, severity: Severity, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let stamps = self.admitted.entry(severity).or_default();
        while let Some(&oldest) = stamps.front() {
            if now.duration_since(oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.max_per_window as usize {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Admissions currently counted against the window for a severity.
    pub fn in_window(&self, severity: Severity) -> usize {
        self.admitted.get(&severity).map_or(0, VecDeque::len)
    }
}
