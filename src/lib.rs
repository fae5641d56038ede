//! Surgical tool tracking library for real-time instrument presence detection.
//!
//! This library ingests a live camera feed, identifies handheld surgical
//! instruments by the markers attached to them, and publishes a debounced,
//! flicker-resistant tool-presence state to any number of independent
//! consumers. It is built on:
//! - `OpenCV` for capture, preprocessing, ArUco marker detection and drawing
//! - ONNX Runtime for hand landmark inference
//! - A per-identity tracker with temporal smoothing and confidence decay
//!
//! The pipeline per cycle:
//! 1. Acquire the freshest camera frame (buffer depth 1)
//! 2. Localize hands on a downscaled copy, once every few cycles
//! 3. Detect markers inside hand regions, on a separate decimation schedule
//! 4. Update the tracker; momentary dropout is absorbed, sustained loss
//!    expires the track
//! 5. Publish an annotated frame and a structured snapshot atomically
//! 6. Debounce appearance events
//!
//! Detection itself is delegated to injectable oracles, so the whole
//! pipeline can be exercised with deterministic fakes.
//!
//! # Examples
//!
//! ```no_run
//! use surgi_track::capture::CameraSource;
//! use surgi_track::config::Config;
//! use surgi_track::oracles::{ArucoMarkerOracle, OnnxHandOracle};
//! use surgi_track::outputs::{JsonLineSink, SnapshotPusher};
//! use surgi_track::pipeline::Pipeline;
//! use surgi_track::publisher::{PipelineControl, Publisher};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! config.validate()?;
//!
//! let source = CameraSource::open(&config.camera)?;
//! let hands = OnnxHandOracle::new(&config.models.hand_landmarks, config.models.hand_score_threshold)?;
//! let markers = ArucoMarkerOracle::new()?;
//!
//! let publisher = Publisher::new();
//! let control = PipelineControl::new();
//!
//! let snapshots = SnapshotPusher::new(
//!     publisher.clone(),
//!     control.clone(),
//!     Duration::from_millis(config.stream.snapshot_interval_ms),
//! );
//! snapshots.attach(Box::new(JsonLineSink::stdout()));
//! let snapshot_task = snapshots.spawn();
//!
//! let pipeline = Pipeline::new(
//!     Box::new(source),
//!     Box::new(hands),
//!     Box::new(markers),
//!     &config,
//!     publisher,
//!     control.clone(),
//! );
//!
//! control.start();
//! let pipeline_task = std::thread::spawn(move || pipeline.run());
//!
//! // ... later
//! control.shutdown();
//! pipeline_task.join().unwrap();
//! snapshot_task.join().unwrap();
//! # Ok(())
//! # }
//! ```

/// Frame acquisition from a camera device
pub mod capture;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Appearance event debouncing
pub mod events;

/// Decimated hand localization
pub mod hand_localizer;

/// Decimated marker detection over hand regions
pub mod marker_detector;

/// External detection oracle contracts and adapters
pub mod oracles;

/// Consumer-facing output tasks
pub mod outputs;

/// Annotated-frame drawing
pub mod overlay;

/// The frame-processing pipeline loop
pub mod pipeline;

/// Shared-state handoff between producer and consumers
pub mod publisher;

/// Known tool-marker registry
pub mod registry;

/// Published value types
pub mod snapshot;

/// Per-identity tool tracking
pub mod tracker;

/// Geometry and casting utilities
pub mod utils;

pub use error::{Error, Result};
