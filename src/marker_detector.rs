//! Decimated marker detection over hand regions.
//!
//! The marker oracle only ever sees hand-proximate crops. Each region is
//! normalized before detection: grayscale, a conditional aspect-preserving
//! upscale to a minimum working resolution (bounds recall at typical
//! camera distances), a light blur, and tiled histogram equalization to
//! counter uneven lighting. Surviving detections are mapped back to frame
//! coordinates and aggregated across regions.

use crate::capture::Frame;
use crate::config::MarkerConfig;
use crate::constants::{CLAHE_CLIP_LIMIT, CLAHE_TILE_SIZE};
use crate::hand_localizer::HandRegion;
use crate::oracles::MarkerOracle;
use crate::registry::ToolRegistry;
use crate::utils::{map_to_frame, polygon_centroid, polygon_perimeter};
use crate::Result;
use log::warn;
use opencv::core::{Mat, Point2f, Size, BORDER_DEFAULT};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use std::collections::HashMap;

/// One cycle's observation of a marker, in frame coordinates
#[derive(Debug, Clone)]
pub struct DetectionCandidate {
    /// Marker id
    pub marker_id: i32,
    /// Instrument label from the registry
    pub label: String,
    /// Corner polygon in frame coordinates
    pub corners: [Point2f; 4],
    /// Polygon centroid in frame coordinates
    pub center: Point2f,
}

/// Adapter over a [`MarkerOracle`], with decimation, preprocessing and
/// registry filtering
pub struct MarkerDetector {
    oracle: Box<dyn MarkerOracle>,
    registry: ToolRegistry,
    every_n: u64,
    upscale_target: i32,
    min_perimeter: f64,
}

impl MarkerDetector {
    /// Create a detector around an injected oracle
    pub fn new(oracle: Box<dyn MarkerOracle>, config: &MarkerConfig) -> Self {
        Self {
            oracle,
            registry: config.registry.clone(),
            every_n: config.every_n.max(1),
            upscale_target: config.upscale_target,
            min_perimeter: config.min_perimeter,
        }
    }

    /// Whether marker detection is scheduled for this cycle
    #[must_use]
    pub fn should_run(&self, cycle: u64) -> bool {
        cycle % self.every_n == 0
    }

    /// Detect markers in all hand regions of the frame.
    ///
    /// A failing region is isolated: it contributes no candidates this
    /// cycle. When the same id surfaces from more than one overlapping
    /// region, the candidate with the larger corner-polygon perimeter wins.
    pub fn detect(&mut self, frame: &Frame, regions: &[HandRegion]) -> Vec<DetectionCandidate> {
        let mut best: HashMap<i32, (f64, DetectionCandidate)> = HashMap::new();

        for region in regions {
            let candidates = match self.detect_in_region(frame, region) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Marker detection failed in region {:?}: {e}", region.bbox);
                    continue;
                }
            };

            for candidate in candidates {
                let perimeter = polygon_perimeter(&candidate.corners);
                match best.get(&candidate.marker_id) {
                    Some((kept, _)) if *kept >= perimeter => {}
                    _ => {
                        best.insert(candidate.marker_id, (perimeter, candidate));
                    }
                }
            }
        }

        let mut candidates: Vec<DetectionCandidate> = best.into_values().map(|(_, c)| c).collect();
        candidates.sort_by_key(|c| c.marker_id);
        candidates
    }

    /// Detect markers within a single hand region
    fn detect_in_region(&mut self, frame: &Frame, region: &HandRegion) -> Result<Vec<DetectionCandidate>> {
        let roi = Mat::roi(&frame.mat, region.bbox)?.try_clone()?;
        if roi.empty() {
            return Ok(Vec::new());
        }

        let mut gray = Mat::default();
        imgproc::cvt_color(&roi, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        // Small regions bound recall: upscale preserving aspect ratio
        let mut upscale = 1.0f32;
        if gray.cols() < self.upscale_target || gray.rows() < self.upscale_target {
            #[allow(clippy::cast_precision_loss)] // Region dimensions are small
            {
                let fx = self.upscale_target as f32 / gray.cols() as f32;
                let fy = self.upscale_target as f32 / gray.rows() as f32;
                upscale = fx.max(fy);
            }
            let mut scaled = Mat::default();
            imgproc::resize(
                &gray,
                &mut scaled,
                Size::new(0, 0),
                f64::from(upscale),
                f64::from(upscale),
                InterpolationFlags::INTER_LINEAR as i32,
            )?;
            gray = scaled;
        }

        let mut blurred = Mat::default();
        imgproc::gaussian_blur(&gray, &mut blurred, Size::new(3, 3), 0.0, 0.0, BORDER_DEFAULT)?;

        // Local contrast normalization against uneven lighting
        let mut clahe = imgproc::create_clahe(CLAHE_CLIP_LIMIT, Size::new(CLAHE_TILE_SIZE, CLAHE_TILE_SIZE))?;
        let mut processed = Mat::default();
        clahe.apply(&blurred, &mut processed)?;

        let raw_markers = self.oracle.detect(&processed)?;

        #[allow(clippy::cast_precision_loss)] // Region origins are small
        let origin = Point2f::new(region.bbox.x as f32, region.bbox.y as f32);
        let mut candidates = Vec::new();
        for marker in raw_markers {
            let Some(label) = self.registry.label(marker.id) else {
                continue;
            };
            // Perimeter is checked in processed-region coordinates, before
            // mapping back, so the threshold is independent of the upscale
            if polygon_perimeter(&marker.corners) < self.min_perimeter {
                continue;
            }

            let corners = map_to_frame(&marker.corners, upscale, origin);
            candidates.push(DetectionCandidate {
                marker_id: marker.id,
                label: label.to_string(),
                center: polygon_centroid(&corners),
                corners,
            });
        }

        Ok(candidates)
    }
}
