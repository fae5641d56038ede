//! ArUco marker oracle backed by `OpenCV`'s objdetect module.

use super::{MarkerOracle, RawMarker};
use crate::Result;
use log::info;
use opencv::core::{Mat, Point2f, Vector};
use opencv::objdetect::{
    self, ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters,
};
use opencv::prelude::*;

/// Marker oracle using a predefined 4x4 ArUco dictionary
pub struct ArucoMarkerOracle {
    detector: ArucoDetector,
}

impl ArucoMarkerOracle {
    /// Create the oracle with detector parameters tuned for interactive
    /// frame rates: fewer adaptive threshold passes and no corner
    /// refinement.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot be constructed.
    pub fn new() -> Result<Self> {
        let dictionary = objdetect::get_predefined_dictionary(PredefinedDictionaryType::DICT_4X4_50)?;

        let mut parameters = DetectorParameters::default()?;
        parameters.set_adaptive_thresh_win_size_min(3);
        parameters.set_adaptive_thresh_win_size_max(35);
        parameters.set_adaptive_thresh_win_size_step(8);
        parameters.set_min_marker_perimeter_rate(0.005);
        parameters.set_max_marker_perimeter_rate(4.0);
        parameters.set_polygonal_approx_accuracy_rate(0.1);
        parameters.set_min_corner_distance_rate(0.02);
        parameters.set_min_distance_to_border(1);
        parameters.set_corner_refinement_method(objdetect::CORNER_REFINE_NONE);
        parameters.set_error_correction_rate(0.6);

        let refine = RefineParameters::new(10.0, 3.0, true)?;
        let detector = ArucoDetector::new(&dictionary, &parameters, refine)?;
        info!("ArUco detector initialized (DICT_4X4_50)");

        Ok(Self { detector })
    }
}

impl MarkerOracle for ArucoMarkerOracle {
    fn detect(&mut self, image: &Mat) -> Result<Vec<RawMarker>> {
        let mut corners: Vector<Vector<Point2f>> = Vector::new();
        let mut ids: Vector<i32> = Vector::new();
        let mut rejected: Vector<Vector<Point2f>> = Vector::new();

        self.detector
            .detect_markers(image, &mut corners, &mut ids, &mut rejected)?;

        let mut markers = Vec::with_capacity(ids.len());
        for (id, polygon) in ids.iter().zip(corners.iter()) {
            if polygon.len() != 4 {
                continue;
            }
            markers.push(RawMarker {
                id,
                corners: [polygon.get(0)?, polygon.get(1)?, polygon.get(2)?, polygon.get(3)?],
            });
        }

        Ok(markers)
    }
}
