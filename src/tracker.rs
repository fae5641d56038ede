//! Per-identity tool tracking with temporal smoothing and confidence decay.
//!
//! Raw marker detections are noisy and intermittent; the tracker turns them
//! into a flicker-resistant "stable tool" set. A fixed hit/miss history
//! window absorbs momentary detection loss, while the frames-lost ceiling
//! bounds how long a vanished tool lingers. Exponential smoothing trades
//! positional responsiveness against jitter.

use crate::config::TrackingConfig;
use crate::marker_detector::DetectionCandidate;
use crate::snapshot::ToolStatus;
use crate::utils::safe_cast::f32_to_i32_clamp;
use opencv::core::{Point, Point2f};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Persistent state for one tracked instrument
#[derive(Debug, Clone)]
pub struct Track {
    /// Marker id
    pub id: i32,
    /// Instrument label
    pub label: String,
    /// Last raw detection center
    pub raw_center: Point2f,
    /// Exponentially smoothed center
    pub smoothed_center: Point2f,
    /// Corner polygon of the last detection
    pub last_corners: [Point2f; 4],
    /// Cycle of the last detection
    pub last_seen_cycle: u64,
    /// Cycles since the last detection
    pub frames_lost: u64,
    history: VecDeque<u8>,
    history_size: usize,
    confidence: f64,
}

impl Track {
    /// Seed a new track from its first detection: full confidence, single hit
    #[must_use]
    pub fn new(candidate: &DetectionCandidate, cycle: u64, history_size: usize) -> Self {
        let mut history = VecDeque::with_capacity(history_size);
        history.push_back(1);
        Self {
            id: candidate.marker_id,
            label: candidate.label.clone(),
            raw_center: candidate.center,
            smoothed_center: candidate.center,
            last_corners: candidate.corners,
            last_seen_cycle: cycle,
            frames_lost: 0,
            history,
            history_size,
            confidence: 1.0,
        }
    }

    /// Fold a redetection into the track
    fn record_hit(&mut self, candidate: &DetectionCandidate, cycle: u64, smoothing: f32) {
        self.smoothed_center = Point2f::new(
            smoothing * self.smoothed_center.x + (1.0 - smoothing) * candidate.center.x,
            smoothing * self.smoothed_center.y + (1.0 - smoothing) * candidate.center.y,
        );
        self.raw_center = candidate.center;
        self.last_corners = candidate.corners;
        self.last_seen_cycle = cycle;
        self.frames_lost = 0;
        self.push_history(1);
    }

    /// Record an absent cycle
    fn record_miss(&mut self, cycle: u64) {
        self.frames_lost = cycle - self.last_seen_cycle;
        self.push_history(0);
    }

    fn push_history(&mut self, hit: u8) {
        if self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(hit);
        let hits: u32 = self.history.iter().map(|&h| u32::from(h)).sum();
        self.confidence = f64::from(hits) / self.history.len() as f64;
    }

    /// Mean of the retained hit/miss history, in [0, 1]
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Whether the tool was seen this cycle or is being coasted
    #[must_use]
    pub fn status(&self) -> ToolStatus {
        if self.frames_lost == 0 {
            ToolStatus::Detected
        } else {
            ToolStatus::Tracking
        }
    }

    /// Smoothed center rounded to integer pixel coordinates
    #[must_use]
    pub fn display_center(&self) -> Point {
        Point::new(
            f32_to_i32_clamp(self.smoothed_center.x, i32::MIN, i32::MAX),
            f32_to_i32_clamp(self.smoothed_center.y, i32::MIN, i32::MAX),
        )
    }

    fn is_valid(&self, config: &TrackingConfig) -> bool {
        self.frames_lost <= config.max_lost_frames && self.confidence >= config.min_confidence
    }
}

/// Multi-object tracker over marker identities
pub struct ToolTracker {
    tracks: BTreeMap<i32, Track>,
    config: TrackingConfig,
    cycle: u64,
    smoothing: f32,
}

impl ToolTracker {
    /// Create a tracker with the given parameters
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Smoothing factor is in [0, 1)
    pub fn new(config: TrackingConfig) -> Self {
        let smoothing = config.smoothing as f32;
        Self {
            tracks: BTreeMap::new(),
            config,
            cycle: 0,
            smoothing,
        }
    }

    /// Advance one cycle with this cycle's (possibly empty) candidate set.
    ///
    /// Every existing id absent from the set receives a miss; tracks past
    /// the frames-lost ceiling or below the confidence floor are dropped.
    pub fn update(&mut self, candidates: &[DetectionCandidate]) {
        self.cycle += 1;

        let mut seen: BTreeSet<i32> = BTreeSet::new();
        for candidate in candidates {
            seen.insert(candidate.marker_id);
            match self.tracks.get_mut(&candidate.marker_id) {
                Some(track) => track.record_hit(candidate, self.cycle, self.smoothing),
                None => {
                    self.tracks.insert(
                        candidate.marker_id,
                        Track::new(candidate, self.cycle, self.config.history_size),
                    );
                }
            }
        }

        for (id, track) in &mut self.tracks {
            if !seen.contains(id) {
                track.record_miss(self.cycle);
            }
        }

        let config = &self.config;
        self.tracks.retain(|_, track| track.is_valid(config));
    }

    /// The surviving stable set, in id order. This is the only set exposed
    /// downstream.
    #[must_use]
    pub fn stable_tools(&self) -> Vec<&Track> {
        self.tracks.values().collect()
    }

    /// Number of live tracks
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Current cycle number
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Drop all tracks and reset the cycle counter
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.cycle = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i32, x: f32, y: f32) -> DetectionCandidate {
        let corners = [
            Point2f::new(x - 5.0, y - 5.0),
            Point2f::new(x + 5.0, y - 5.0),
            Point2f::new(x + 5.0, y + 5.0),
            Point2f::new(x - 5.0, y + 5.0),
        ];
        DetectionCandidate {
            marker_id: id,
            label: format!("tool_{id}"),
            corners,
            center: Point2f::new(x, y),
        }
    }

    fn tracker(history_size: usize, min_confidence: f64, max_lost_frames: u64) -> ToolTracker {
        ToolTracker::new(TrackingConfig {
            history_size,
            min_confidence,
            max_lost_frames,
            smoothing: 0.3,
        })
    }

    #[test]
    fn test_track_created_on_first_detection() {
        let mut tracker = tracker(10, 0.4, 25);
        tracker.update(&[candidate(20, 100.0, 100.0)]);

        let stable = tracker.stable_tools();
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].id, 20);
        assert_eq!(stable[0].confidence(), 1.0);
        assert_eq!(stable[0].status(), ToolStatus::Detected);
    }

    #[test]
    fn test_confidence_is_history_mean() {
        let mut tracker = tracker(10, 0.0, 100);
        tracker.update(&[candidate(20, 0.0, 0.0)]);
        tracker.update(&[]);
        tracker.update(&[candidate(20, 0.0, 0.0)]);
        tracker.update(&[]);

        // History: 1, 0, 1, 0
        let stable = tracker.stable_tools();
        assert!((stable[0].confidence() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_frames_lost_recomputed_from_last_seen() {
        let mut tracker = tracker(10, 0.0, 100);
        tracker.update(&[candidate(20, 0.0, 0.0)]); // cycle 1
        tracker.update(&[]); // cycle 2
        tracker.update(&[]); // cycle 3

        let stable = tracker.stable_tools();
        assert_eq!(stable[0].last_seen_cycle, 1);
        assert_eq!(stable[0].frames_lost, 2);
        assert_eq!(stable[0].status(), ToolStatus::Tracking);
    }

    #[test]
    fn test_status_recovers_on_redetection() {
        let mut tracker = tracker(10, 0.0, 100);
        tracker.update(&[candidate(20, 0.0, 0.0)]);
        tracker.update(&[]);
        tracker.update(&[candidate(20, 1.0, 1.0)]);

        let stable = tracker.stable_tools();
        assert_eq!(stable[0].frames_lost, 0);
        assert_eq!(stable[0].status(), ToolStatus::Detected);
    }

    #[test]
    fn test_removed_by_confidence_floor() {
        // With a window of 10 and floor 0.4, a never-redetected track
        // falls below the floor on the second miss: 1/3 < 0.4
        let mut tracker = tracker(10, 0.4, 25);
        tracker.update(&[candidate(20, 0.0, 0.0)]); // cycle 1
        tracker.update(&[]); // 1,0 -> 0.5
        assert_eq!(tracker.track_count(), 1);
        tracker.update(&[]); // 1,0,0 -> 1/3
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_removed_by_frames_lost_ceiling() {
        // Confidence floor disabled: only the ceiling can trigger
        let mut tracker = tracker(10, 0.0, 25);
        tracker.update(&[candidate(20, 0.0, 0.0)]); // cycle 1
        for _ in 0..25 {
            tracker.update(&[]);
        }
        // frames_lost = 25 at cycle 26, still within ceiling
        assert_eq!(tracker.track_count(), 1);
        tracker.update(&[]);
        // frames_lost = 26 > 25
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_single_frame_dropout_does_not_flicker() {
        let mut tracker = tracker(10, 0.4, 25);
        for i in 0..10 {
            if i == 5 {
                tracker.update(&[]); // one bad frame
            } else {
                tracker.update(&[candidate(20, 0.0, 0.0)]);
            }
            assert_eq!(tracker.track_count(), 1, "flickered at cycle {i}");
        }
    }

    #[test]
    fn test_smoothing_converges_without_bias() {
        let mut tracker = tracker(10, 0.0, 100);
        tracker.update(&[candidate(20, 0.0, 0.0)]);

        // Constant raw input: smoothed center must converge to it
        for _ in 0..50 {
            tracker.update(&[candidate(20, 80.0, 60.0)]);
        }
        let stable = tracker.stable_tools();
        let center = stable[0].smoothed_center;
        assert!((center.x - 80.0).abs() < 1e-3);
        assert!((center.y - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_smoothing_first_step() {
        let mut tracker = tracker(10, 0.0, 100);
        tracker.update(&[candidate(20, 0.0, 0.0)]);
        tracker.update(&[candidate(20, 10.0, 10.0)]);

        // alpha = 0.3 weights the previous smoothed value
        let stable = tracker.stable_tools();
        assert!((stable[0].smoothed_center.x - 7.0).abs() < 1e-5);
        assert!((stable[0].smoothed_center.y - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_independent_identities() {
        let mut tracker = tracker(10, 0.4, 25);
        tracker.update(&[candidate(20, 0.0, 0.0), candidate(21, 50.0, 50.0)]);
        tracker.update(&[candidate(21, 51.0, 50.0)]);
        tracker.update(&[candidate(21, 52.0, 50.0)]);

        let stable = tracker.stable_tools();
        assert_eq!(stable.len(), 2);
        assert_eq!(stable[0].id, 20);
        assert_eq!(stable[0].status(), ToolStatus::Tracking);
        assert_eq!(stable[1].id, 21);
        assert_eq!(stable[1].status(), ToolStatus::Detected);
    }

    #[test]
    fn test_reset() {
        let mut tracker = tracker(10, 0.4, 25);
        tracker.update(&[candidate(20, 0.0, 0.0)]);
        tracker.reset();
        assert_eq!(tracker.track_count(), 0);
        assert_eq!(tracker.cycle(), 0);
    }
}
