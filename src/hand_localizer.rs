//! Decimated hand localization.
//!
//! The hand oracle is expensive, so it runs only once every `every_n`
//! pipeline cycles on a downscaled copy of the frame; between invocations
//! the most recent region set is reused verbatim. Hand regions may
//! therefore lag real motion by up to `every_n - 1` cycles.

use crate::capture::Frame;
use crate::config::HandConfig;
use crate::oracles::{HandLandmarks, HandOracle};
use crate::utils::safe_cast::f32_to_i32_clamp;
use crate::Result;
use log::warn;
use opencv::core::{Mat, Point2f, Rect, Size};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// A hand-proximate region of interest in frame coordinates
#[derive(Debug, Clone)]
pub struct HandRegion {
    /// Padded, clamped bounding box
    pub bbox: Rect,
    /// Landmarks in frame-pixel coordinates
    pub landmarks: Vec<Point2f>,
}

/// Adapter over a [`HandOracle`], with decimation and result caching
pub struct HandLocalizer {
    oracle: Box<dyn HandOracle>,
    every_n: u64,
    scale: f64,
    padding: i32,
    cached: Vec<HandRegion>,
}

impl HandLocalizer {
    /// Create a localizer around an injected oracle
    pub fn new(oracle: Box<dyn HandOracle>, config: &HandConfig) -> Self {
        Self {
            oracle,
            every_n: config.every_n.max(1),
            scale: config.scale,
            padding: config.padding,
            cached: Vec::new(),
        }
    }

    /// Update the region set for this cycle and return it.
    ///
    /// On scheduled cycles the oracle runs and the cache is replaced; an
    /// oracle failure is isolated to that cycle and yields an empty set.
    /// On all other cycles the cached set is returned unchanged.
    pub fn update(&mut self, frame: &Frame) -> &[HandRegion] {
        if frame.index % self.every_n == 0 {
            match self.localize(frame) {
                Ok(regions) => self.cached = regions,
                Err(e) => {
                    warn!("Hand localization failed, treating cycle as empty: {e}");
                    self.cached = Vec::new();
                }
            }
        }
        &self.cached
    }

    /// Most recent region set without running the oracle
    #[must_use]
    pub fn regions(&self) -> &[HandRegion] {
        &self.cached
    }

    fn localize(&mut self, frame: &Frame) -> Result<Vec<HandRegion>> {
        // Oracle cost is bounded by running on a downscaled RGB copy;
        // landmark output is normalized, so boxes are computed against
        // the full-resolution frame.
        let mut small = Mat::default();
        imgproc::resize(
            &frame.mat,
            &mut small,
            Size::new(0, 0),
            self.scale,
            self.scale,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&small, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let detections = self.oracle.detect(&rgb)?;

        let width = frame.width();
        let height = frame.height();
        Ok(detections
            .iter()
            .filter_map(|hand| self.to_region(hand, width, height))
            .collect())
    }

    /// Build a padded, clamped bounding box from landmark extrema
    #[allow(clippy::cast_precision_loss)] // Frame dimensions are small
    fn to_region(&self, hand: &HandLandmarks, width: i32, height: i32) -> Option<HandRegion> {
        if hand.points.is_empty() {
            return None;
        }

        let landmarks: Vec<Point2f> = hand
            .points
            .iter()
            .map(|p| Point2f::new(p.x * width as f32, p.y * height as f32))
            .collect();

        let mut x_min = f32::INFINITY;
        let mut y_min = f32::INFINITY;
        let mut x_max = f32::NEG_INFINITY;
        let mut y_max = f32::NEG_INFINITY;
        for p in &landmarks {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }

        let x0 = f32_to_i32_clamp(x_min, 0, width) - self.padding;
        let y0 = f32_to_i32_clamp(y_min, 0, height) - self.padding;
        let x1 = f32_to_i32_clamp(x_max, 0, width) + self.padding;
        let y1 = f32_to_i32_clamp(y_max, 0, height) + self.padding;

        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(width);
        let y1 = y1.min(height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(HandRegion {
            bbox: Rect::new(x0, y0, x1 - x0, y1 - y0),
            landmarks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use std::time::Instant;

    struct FixedHandOracle {
        hands: Vec<HandLandmarks>,
        calls: usize,
        fail: bool,
    }

    impl HandOracle for FixedHandOracle {
        fn detect(&mut self, _image: &Mat) -> Result<Vec<HandLandmarks>> {
            self.calls += 1;
            if self.fail {
                return Err(crate::Error::ModelError("oracle down".to_string()));
            }
            Ok(self.hands.clone())
        }
    }

    fn test_frame(index: u64) -> Frame {
        let mat = Mat::zeros(480, 640, opencv::core::CV_8UC3).unwrap().to_mat().unwrap();
        Frame {
            mat,
            index,
            captured_at: Instant::now(),
        }
    }

    fn centered_hand() -> HandLandmarks {
        HandLandmarks {
            points: vec![
                Point2f::new(0.4, 0.4),
                Point2f::new(0.5, 0.45),
                Point2f::new(0.6, 0.5),
            ],
        }
    }

    fn localizer(oracle: FixedHandOracle, every_n: u64, padding: i32) -> HandLocalizer {
        let config = HandConfig {
            every_n,
            scale: 0.5,
            padding,
        };
        HandLocalizer::new(Box::new(oracle), &config)
    }

    #[test]
    fn test_padded_clamped_bbox() {
        let oracle = FixedHandOracle {
            hands: vec![centered_hand()],
            calls: 0,
            fail: false,
        };
        let mut localizer = localizer(oracle, 1, 120);

        let regions = localizer.update(&test_frame(1)).to_vec();
        assert_eq!(regions.len(), 1);

        let bbox = regions[0].bbox;
        // Landmark extrema: x in [256, 384], y in [192, 240]; padding 120
        assert_eq!(bbox.x, 136);
        assert_eq!(bbox.y, 72);
        assert_eq!(bbox.width, 504 - 136);
        assert_eq!(bbox.height, 360 - 72);

        // Landmarks are reported in frame coordinates
        assert!((regions[0].landmarks[0].x - 256.0).abs() < 1e-3);
        assert!((regions[0].landmarks[0].y - 192.0).abs() < 1e-3);
    }

    #[test]
    fn test_bbox_clamped_at_frame_edge() {
        let oracle = FixedHandOracle {
            hands: vec![HandLandmarks {
                points: vec![Point2f::new(0.02, 0.02), Point2f::new(0.98, 0.98)],
            }],
            calls: 0,
            fail: false,
        };
        let mut localizer = localizer(oracle, 1, 120);

        let regions = localizer.update(&test_frame(1)).to_vec();
        let bbox = regions[0].bbox;
        assert_eq!(bbox.x, 0);
        assert_eq!(bbox.y, 0);
        assert_eq!(bbox.width, 640);
        assert_eq!(bbox.height, 480);
    }

    #[test]
    fn test_decimation_reuses_cache() {
        let oracle = FixedHandOracle {
            hands: vec![centered_hand()],
            calls: 0,
            fail: false,
        };
        let mut localizer = localizer(oracle, 3, 10);

        // Cycles 1 and 2 are skipped; cycle 3 runs the oracle
        assert!(localizer.update(&test_frame(1)).is_empty());
        assert!(localizer.update(&test_frame(2)).is_empty());
        assert_eq!(localizer.update(&test_frame(3)).len(), 1);

        // Cycles 4 and 5 reuse the cached set verbatim
        let cached = localizer.update(&test_frame(4)).to_vec();
        assert_eq!(cached.len(), 1);
        assert_eq!(localizer.update(&test_frame(5)).len(), 1);
        assert_eq!(localizer.update(&test_frame(6)).len(), 1);
    }

    #[test]
    fn test_oracle_failure_yields_empty_cycle() {
        let oracle = FixedHandOracle {
            hands: vec![centered_hand()],
            calls: 0,
            fail: true,
        };
        let mut localizer = localizer(oracle, 1, 10);

        assert!(localizer.update(&test_frame(1)).is_empty());
        assert!(localizer.regions().is_empty());
    }
}
