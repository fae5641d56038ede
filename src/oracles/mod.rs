//! External detection oracles.
//!
//! The marker and hand-landmark localization algorithms are not part of
//! this crate's design: they are opaque capabilities consumed through the
//! narrow contracts below. Adapters are constructed explicitly and injected,
//! so trackers and pipelines can be exercised with deterministic fakes.

/// ArUco-backed marker oracle
pub mod aruco;

/// ONNX-backed hand landmark oracle
pub mod hand_onnx;

use crate::Result;
use opencv::core::{Mat, Point2f};

pub use aruco::ArucoMarkerOracle;
pub use hand_onnx::OnnxHandOracle;

/// Raw marker observation, in pixel coordinates of the oracle's input image
#[derive(Debug, Clone)]
pub struct RawMarker {
    /// Marker id
    pub id: i32,
    /// 4-point corner polygon
    pub corners: [Point2f; 4],
}

/// One detected hand: an ordered landmark set with normalized coordinates
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    /// Landmarks as (x, y) in [0, 1] of the input image
    pub points: Vec<Point2f>,
}

/// Marker detection oracle.
///
/// Input is a normalized single-channel image; output is zero or more
/// markers with corners in the input's pixel coordinates.
pub trait MarkerOracle: Send {
    /// Detect markers in the image
    fn detect(&mut self, image: &Mat) -> Result<Vec<RawMarker>>;
}

/// Hand landmark oracle.
///
/// Input is an RGB image; output is zero or more landmark sets with
/// normalized coordinates.
pub trait HandOracle: Send {
    /// Detect hand landmark sets in the image
    fn detect(&mut self, image: &Mat) -> Result<Vec<HandLandmarks>>;
}
