//! Frame acquisition from a camera device.
//!
//! The capture buffer depth is 1: an unread frame is discarded in favor of
//! a fresher one, trading completeness for bounded staleness.

use crate::config::CameraConfig;
use crate::{Error, Result};
use log::info;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE};
use std::time::Instant;

/// A single captured frame. Cycle-scoped; replaced every pipeline cycle.
pub struct Frame {
    /// BGR pixel buffer
    pub mat: Mat,
    /// Monotonic capture index, starting at 1
    pub index: u64,
    /// Capture time
    pub captured_at: Instant,
}

impl Frame {
    /// Frame width in pixels
    #[must_use]
    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    /// Frame height in pixels
    #[must_use]
    pub fn height(&self) -> i32 {
        self.mat.rows()
    }
}

/// Source of camera frames
pub trait FrameSource: Send {
    /// Acquire the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] when no frame could be read;
    /// the caller retries after a short delay and never terminates on it.
    fn acquire(&mut self) -> Result<Frame>;
}

/// Camera-backed frame source
pub struct CameraSource {
    capture: VideoCapture,
    next_index: u64,
}

impl CameraSource {
    /// Open a camera device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the device cannot be opened.
    /// This is fatal at startup: without a frame source the pipeline loop
    /// must not be entered.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        info!("Opening camera {}", config.index);
        let mut capture = VideoCapture::new(config.index, videoio::CAP_ANY)?;

        if !capture.is_opened()? {
            return Err(Error::DeviceUnavailable(format!(
                "could not open camera {}",
                config.index
            )));
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(config.width))?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(config.height))?;
        capture.set(videoio::CAP_PROP_FPS, config.fps)?;

        // No frame queuing: always read the freshest frame
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;
        info!("Camera buffer size set to 1 for low latency");

        Ok(Self {
            capture,
            next_index: 1,
        })
    }
}

impl FrameSource for CameraSource {
    fn acquire(&mut self) -> Result<Frame> {
        let mut mat = Mat::default();
        let grabbed = self.capture.read(&mut mat)?;

        if !grabbed || mat.empty() {
            return Err(Error::DeviceUnavailable("no frame available".to_string()));
        }

        let frame = Frame {
            mat,
            index: self.next_index,
            captured_at: Instant::now(),
        };
        self.next_index += 1;
        Ok(frame)
    }
}
