//! Property-style checks of the tracker confidence window


use rand::Rng;
use std::collections::VecDeque;
use surgi_track::config::TrackingConfig;
use surgi_track::tracker::ToolTracker;
use test_helpers::candidate;

/// Reference model: confidence = hits / min(cycles_seen, window)
struct ReferenceWindow {
    window: usize,
    history: VecDeque<u8>,
}

impl ReferenceWindow {
    fn new(window: usize) -> Self {
        Self {
            window,
            history: VecDeque::new(),
        }
    }

    fn push(&mut self, hit: bool) {
        if self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(u8::from(hit));
    }

    fn confidence(&self) -> f64 {
        let hits: u32 = self.history.iter().map(|&h| u32::from(h)).sum();
        f64::from(hits) / self.history.len() as f64
    }
}

#[test]
fn test_confidence_matches_window_mean_on_random_sequences() {
    let mut rng = rand::thread_rng();

    for trial in 0..50 {
        let window = rng.gen_range(3..=12);
        // Floors disabled so the track survives the whole sequence
        let mut tracker = ToolTracker::new(TrackingConfig {
            history_size: window,
            min_confidence: 0.0,
            max_lost_frames: u64::MAX,
            smoothing: 0.3,
        });
        let mut reference: Option<ReferenceWindow> = None;

        for step in 0..80 {
            let hit = rng.gen_bool(0.6);
            if hit {
                tracker.update(&[candidate(20, "scalpel", 10.0, 10.0)]);
                match &mut reference {
                    Some(reference) => reference.push(true),
                    None => {
                        let mut fresh = ReferenceWindow::new(window);
                        fresh.push(true);
                        reference = Some(fresh);
                    }
                }
            } else {
                tracker.update(&[]);
                // Misses are only recorded once the track exists
                if let Some(reference) = &mut reference {
                    reference.push(false);
                }
            }

            if let Some(reference) = &reference {
                let stable = tracker.stable_tools();
                assert_eq!(stable.len(), 1, "trial {trial} step {step}: track missing");
                let confidence = stable[0].confidence();
                assert!(
                    (confidence - reference.confidence()).abs() < 1e-9,
                    "trial {trial} step {step}: {confidence} != {}",
                    reference.confidence()
                );
                assert!((0.0..=1.0).contains(&confidence));
            }
        }
    }
}

#[test]
fn test_removal_cycle_is_exact() {
    // A track created at cycle t and never redetected is removed at the
    // earlier of its two triggers; here the ceiling is the binding one
    for ceiling in [1u64, 5, 25] {
        let mut tracker = ToolTracker::new(TrackingConfig {
            history_size: 10,
            min_confidence: 0.0,
            max_lost_frames: ceiling,
            smoothing: 0.3,
        });
        tracker.update(&[candidate(20, "scalpel", 0.0, 0.0)]);

        for _ in 0..ceiling {
            tracker.update(&[]);
            assert_eq!(tracker.track_count(), 1, "dropped early at ceiling {ceiling}");
        }
        tracker.update(&[]);
        assert_eq!(tracker.track_count(), 0, "survived past ceiling {ceiling}");
    }
}

#[test]
fn test_confidence_floor_triggers_before_ceiling() {
    // With the default window of 10 and floor 0.4, 1 hit followed by
    // misses crosses the floor at the second miss (1/3 < 0.4), far
    // before a ceiling of 25
    let mut tracker = ToolTracker::new(TrackingConfig {
        history_size: 10,
        min_confidence: 0.4,
        max_lost_frames: 25,
        smoothing: 0.3,
    });
    tracker.update(&[candidate(20, "scalpel", 0.0, 0.0)]);
    tracker.update(&[]);
    assert_eq!(tracker.track_count(), 1);
    tracker.update(&[]);
    assert_eq!(tracker.track_count(), 0);
}
