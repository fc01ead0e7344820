use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Per-category repeat suppression.
///
/// A category may not re-fire until `last_fired + cooldown <= now`.
/// Entries are created on first fire and updated on each admitted re-fire;
/// a rejected check leaves state unchanged. Categories never block each
/// other.
pub struct CooldownGate {
    cooldown: Duration,
    last_fired: DashMap<String, Instant>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: DashMap::new(),
        }
    }

    /// Returns true and records `now` if the category may fire.
    pub fn allow(&self, category: &str, now: Instant) -> bool {
        match self.last_fired.entry(category.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) >= self.cooldown {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Number of categories that have fired at least once.
    pub fn tracked_categories(&self) -> usize {
        self.last_fired.len()
    }
}
