//! Published value types.
//!
//! These are the immutable views handed to downstream consumers; they are
//! built once per pipeline cycle and never mutated after publish.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Presence status of a stable tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// Seen by the marker oracle this cycle
    Detected,
    /// Briefly lost; position is smoothed/predicted
    Tracking,
}

/// Published view of one stable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    /// Marker id
    pub id: i32,
    /// Instrument label
    pub label: String,
    /// Track confidence in [0, 1], rounded to three decimals
    pub confidence: f64,
    /// Presence status
    pub status: ToolStatus,
}

/// Emitted once when a tool becomes stable after an absence of at least
/// the reprint window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceEvent {
    /// Marker id
    pub id: i32,
    /// Instrument label
    pub label: String,
    /// Confidence at emission time
    pub confidence: f64,
    /// Status at emission time
    pub status: ToolStatus,
}

/// Immutable per-cycle state published to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO-8601 local timestamp
    pub timestamp: String,
    /// Mean FPS over the recent window, rounded to one decimal
    pub fps: f64,
    /// Number of hand regions this cycle
    #[serde(rename = "handCount")]
    pub hand_count: usize,
    /// Every currently stable tool; never debounced
    pub tools: Vec<ToolState>,
    /// Debounced appearance events for this cycle only
    pub events: Vec<AppearanceEvent>,
}

impl Snapshot {
    /// The set of stable tool ids in this snapshot
    #[must_use]
    pub fn stable_ids(&self) -> BTreeSet<i32> {
        self.tools.iter().map(|t| t.id).collect()
    }
}
