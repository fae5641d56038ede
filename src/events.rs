//! Appearance event debouncing.
//!
//! A stable tool is announced exactly once when it first becomes valid.
//! Re-announcement is suppressed until the id has been absent from the
//! valid set for at least the reprint window; a fresh appearance after
//! that re-triggers an event. The snapshot's tool list is never
//! rate-limited, only this event feed is.

use crate::config::EventConfig;
use crate::snapshot::AppearanceEvent;
use crate::tracker::Track;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Debouncer for tool appearance notifications
pub struct EventDebouncer {
    reprint_window: Duration,
    last_announced: HashMap<i32, Instant>,
    last_seen: HashMap<i32, Instant>,
}

impl EventDebouncer {
    /// Create a debouncer with the configured reprint window
    #[must_use]
    pub fn new(config: &EventConfig) -> Self {
        Self {
            reprint_window: Duration::from_secs_f64(config.reprint_secs.max(0.0)),
            last_announced: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }

    /// Process this cycle's stable set, returning newly announced events.
    ///
    /// `now` is passed in rather than sampled so timelines are testable.
    pub fn update(&mut self, stable: &[&Track], now: Instant) -> Vec<AppearanceEvent> {
        let mut events = Vec::new();

        for track in stable {
            self.last_seen.insert(track.id, now);
            if !self.last_announced.contains_key(&track.id) {
                self.last_announced.insert(track.id, now);
                events.push(AppearanceEvent {
                    id: track.id,
                    label: track.label.clone(),
                    confidence: round3(track.confidence()),
                    status: track.status(),
                });
            }
        }

        // Ids absent long enough are forgotten, so their return announces again
        let current: std::collections::HashSet<i32> = stable.iter().map(|t| t.id).collect();
        let window = self.reprint_window;
        let last_seen = &mut self.last_seen;
        self.last_announced.retain(|id, _| {
            if current.contains(id) {
                return true;
            }
            match last_seen.get(id) {
                Some(seen) if now.duration_since(*seen) > window => {
                    last_seen.remove(id);
                    false
                }
                _ => true,
            }
        });

        events
    }

    /// Number of ids currently suppressed from re-announcement
    #[must_use]
    pub fn suppressed_count(&self) -> usize {
        self.last_announced.len()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
