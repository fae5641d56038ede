//! Hand landmark oracle using `ONNX` Runtime.
//!
//! Wraps a single-hand landmark model (21 keypoints plus a presence
//! score). The oracle contract allows zero or more landmark sets; this
//! implementation reports at most one per invocation, gated on the
//! model's presence score.

use super::{HandLandmarks, HandOracle};
use crate::constants::NUM_HAND_LANDMARKS;
use crate::Result;
use ndarray::{Array1, Array4, CowArray};
use opencv::core::{Mat, Point2f, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark model input size
const DEFAULT_HAND_INPUT_SIZE: i32 = 224;

/// Hand landmark detector using `ONNX` Runtime
pub struct OnnxHandOracle {
    session: Session,
    input_size: i32,
    score_threshold: f32,
}

impl OnnxHandOracle {
    /// Create a new hand landmark oracle from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P, score_threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing OnnxHandOracle with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("hand_oracle")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(crate::error::Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.len() < 2 {
            return Err(crate::error::Error::ModelOutputError(
                "Model must expose landmark and score outputs".to_string(),
            ));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_HAND_INPUT_SIZE,
            score_threshold,
        })
    }

    /// Preprocess an RGB image for the model
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn preprocess(&self, image: &Mat) -> Result<Array4<f32>> {
        let size = self.input_size as usize;
        let channels = 3;

        // Resize to model input size
        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        // Convert to f32 and normalize to [0, 1]
        let mut float_image = Mat::default();
        resized.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = vec![0.0f32; size * size * channels];
        for row in 0..self.input_size {
            for col in 0..self.input_size {
                let pixel = float_image.at_2d::<opencv::core::Vec3f>(row, col)?;
                let offset = ((row as usize) * size + col as usize) * channels;
                for ch in 0..channels {
                    data[offset + ch] = pixel[ch];
                }
            }
        }

        // Model expects NHWC
        Array4::from_shape_vec((1, size, size, channels), data)
            .map_err(|e| crate::error::Error::ModelDataFormatError(format!("Failed to create array: {e}")))
    }

    /// Run forward pass, returning the landmark vector and presence score
    fn forward(&self, inputs: Array4<f32>) -> Result<(Array1<f32>, f32)> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let mut outputs = outputs.into_iter();

        let landmark_output = outputs
            .next()
            .ok_or_else(|| crate::error::Error::ModelOutputError("No landmark output from model".to_string()))?;
        let landmark_tensor = landmark_output.try_extract::<f32>()?;
        let landmark_view = landmark_tensor.view();
        let landmarks = landmark_view
            .as_slice()
            .ok_or_else(|| crate::error::Error::ModelOutputError("Failed to get landmark data".to_string()))?
            .to_vec();

        let score_output = outputs
            .next()
            .ok_or_else(|| crate::error::Error::ModelOutputError("No score output from model".to_string()))?;
        let score_tensor = score_output.try_extract::<f32>()?;
        let score_view = score_tensor.view();
        let score = score_view
            .as_slice()
            .and_then(<[f32]>::first)
            .copied()
            .ok_or_else(|| crate::error::Error::ModelOutputError("Failed to get score data".to_string()))?;

        Ok((Array1::from(landmarks), score))
    }

    /// Convert model output to a normalized landmark set
    #[allow(clippy::cast_precision_loss)] // Precision loss acceptable for pixel coordinates
    fn postprocess(&self, landmarks: &Array1<f32>) -> Result<HandLandmarks> {
        // The model emits (x, y, z) per landmark in input-pixel units
        let n_coords = 3;
        if landmarks.len() < NUM_HAND_LANDMARKS * n_coords {
            return Err(crate::error::Error::ModelOutputError(format!(
                "Expected {} landmark values, got {}",
                NUM_HAND_LANDMARKS * n_coords,
                landmarks.len()
            )));
        }

        let scale = self.input_size as f32;
        let points = (0..NUM_HAND_LANDMARKS)
            .map(|i| {
                let idx = i * n_coords;
                Point2f::new(landmarks[idx] / scale, landmarks[idx + 1] / scale)
            })
            .collect();

        Ok(HandLandmarks { points })
    }
}

impl HandOracle for OnnxHandOracle {
    fn detect(&mut self, image: &Mat) -> Result<Vec<HandLandmarks>> {
        let inputs = self.preprocess(image)?;
        let (landmarks, score) = self.forward(inputs)?;

        if score < self.score_threshold {
            return Ok(Vec::new());
        }

        Ok(vec![self.postprocess(&landmarks)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_count() {
        assert_eq!(NUM_HAND_LANDMARKS, 21);
    }

    #[test]
    fn test_default_input_size() {
        assert_eq!(DEFAULT_HAND_INPUT_SIZE, 224);
    }

    #[test]
    fn test_landmark_data_layout() {
        // Each landmark carries 3 values (x, y, z)
        assert_eq!(NUM_HAND_LANDMARKS * 3, 63);
    }
}
