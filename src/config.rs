//! Configuration management for the tool tracking application

use crate::constants::*;
use crate::registry::ToolRegistry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera configuration
    pub camera: CameraConfig,

    /// Model configuration
    pub models: ModelConfig,

    /// Hand localization configuration
    pub hand: HandConfig,

    /// Marker detection configuration
    pub marker: MarkerConfig,

    /// Tracking configuration
    pub tracking: TrackingConfig,

    /// Appearance event configuration
    pub events: EventConfig,

    /// Output stream configuration
    pub stream: StreamConfig,
}

/// Camera device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Requested frame width
    pub width: i32,

    /// Requested frame height
    pub height: i32,

    /// Requested capture framerate
    pub fps: f64,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the hand landmark ONNX model
    pub hand_landmarks: PathBuf,

    /// Minimum hand presence score accepted from the landmark model
    pub hand_score_threshold: f32,
}

/// Hand localization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandConfig {
    /// Run the hand oracle once every N pipeline cycles
    pub every_n: u64,

    /// Downscale factor applied before the hand oracle (0, 1]
    pub scale: f64,

    /// Padding around the landmark bounding box, in pixels
    pub padding: i32,
}

/// Marker detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Run the marker oracle once every N pipeline cycles
    pub every_n: u64,

    /// Minimum working resolution for a hand region; smaller regions are
    /// upscaled to this size preserving aspect ratio
    pub upscale_target: i32,

    /// Minimum accepted corner-polygon perimeter, in processed-region pixels
    pub min_perimeter: f64,

    /// Marker id to instrument label registry
    pub registry: ToolRegistry,
}

/// Tracker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Hit/miss history window per track
    pub history_size: usize,

    /// Tracks below this confidence are dropped (0.0-1.0)
    pub min_confidence: f64,

    /// Tracks lost for more than this many cycles are dropped
    pub max_lost_frames: u64,

    /// Exponential smoothing factor for track centers; weights the
    /// previous smoothed position (0.0-1.0, lower is more responsive)
    pub smoothing: f64,
}

/// Appearance event parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Seconds a tool must be absent before its reappearance is
    /// announced again
    pub reprint_secs: f64,
}

/// Output stream parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// JPEG quality for published frames (0-100)
    pub jpeg_quality: i32,

    /// Media pusher cadence in milliseconds
    pub frame_interval_ms: u64,

    /// Snapshot pusher cadence in milliseconds
    pub snapshot_interval_ms: u64,

    /// Sleep between activation checks while deactivated, in milliseconds
    pub idle_poll_ms: u64,

    /// Backoff after a failed frame acquisition, in milliseconds
    pub acquire_retry_ms: u64,

    /// Number of samples in the published FPS average
    pub fps_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            models: ModelConfig::default(),
            hand: HandConfig::default(),
            marker: MarkerConfig::default(),
            tracking: TrackingConfig::default(),
            events: EventConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hand_landmarks: PathBuf::from("assets/hand_landmarks.onnx"),
            hand_score_threshold: 0.5,
        }
    }
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            every_n: DEFAULT_HAND_EVERY_N,
            scale: DEFAULT_HAND_SCALE,
            padding: DEFAULT_HAND_PADDING,
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            every_n: DEFAULT_MARKER_EVERY_N,
            upscale_target: DEFAULT_UPSCALE_TARGET,
            min_perimeter: DEFAULT_MIN_MARKER_PERIMETER,
            registry: ToolRegistry::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_lost_frames: DEFAULT_MAX_LOST_FRAMES,
            smoothing: DEFAULT_POSITION_SMOOTHING,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            reprint_secs: DEFAULT_REPRINT_SECS,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            snapshot_interval_ms: DEFAULT_SNAPSHOT_INTERVAL_MS,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            acquire_retry_ms: DEFAULT_ACQUIRE_RETRY_MS,
            fps_window: DEFAULT_FPS_WINDOW,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.camera.width <= 0 || self.camera.height <= 0 {
            return Err(Error::ConfigError("Camera frame size must be positive".to_string()));
        }
        if self.camera.fps <= 0.0 {
            return Err(Error::ConfigError("Camera framerate must be positive".to_string()));
        }

        if self.hand.every_n == 0 || self.marker.every_n == 0 {
            return Err(Error::ConfigError(
                "Decimation intervals must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.hand.scale) || self.hand.scale == 0.0 {
            return Err(Error::ConfigError(
                "Hand downscale factor must be in (0.0, 1.0]".to_string(),
            ));
        }
        if self.hand.padding < 0 {
            return Err(Error::ConfigError("Hand padding must not be negative".to_string()));
        }

        if self.marker.upscale_target <= 0 {
            return Err(Error::ConfigError("Upscale target must be positive".to_string()));
        }
        if self.marker.min_perimeter < 0.0 {
            return Err(Error::ConfigError(
                "Minimum marker perimeter must not be negative".to_string(),
            ));
        }
        if self.marker.registry.is_empty() {
            return Err(Error::ConfigError("Tool marker registry is empty".to_string()));
        }

        if self.tracking.history_size == 0 {
            return Err(Error::ConfigError(
                "Detection history size must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tracking.min_confidence) {
            return Err(Error::ConfigError(
                "Minimum confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.tracking.smoothing) {
            return Err(Error::ConfigError(
                "Smoothing factor must be in [0.0, 1.0)".to_string(),
            ));
        }

        if self.events.reprint_secs < 0.0 {
            return Err(Error::ConfigError("Reprint window must not be negative".to_string()));
        }

        if !(0..=100).contains(&self.stream.jpeg_quality) {
            return Err(Error::ConfigError(
                "JPEG quality must be between 0 and 100".to_string(),
            ));
        }
        if self.stream.frame_interval_ms == 0 || self.stream.snapshot_interval_ms == 0 || self.stream.idle_poll_ms == 0
        {
            return Err(Error::ConfigError("Pusher and poll intervals must be positive".to_string()));
        }
        if self.stream.fps_window == 0 {
            return Err(Error::ConfigError("FPS window must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Surgical Tool Tracking Configuration

# Camera device
camera:
  index: 0
  width: 640
  height: 480
  fps: 30.0

# Model paths
models:
  hand_landmarks: "assets/hand_landmarks.onnx"
  hand_score_threshold: 0.5

# Hand localization
hand:
  every_n: 3
  scale: 0.5
  padding: 120

# Marker detection
marker:
  every_n: 2
  upscale_target: 380
  min_perimeter: 15.0
  registry:
    20: scalpel
    21: artery_forceps
    22: iris_scissors
    23: operating_scissors
    24: tweezers
    25: aspirator
    26: bending_shear
    27: circular_spoon
    28: core_needle
    29: fine_needle
    30: rongeur_forceps_1
    31: rongeur_forceps_2
    32: stripping
    33: wire_grabbing_pliers

# Tracking
tracking:
  history_size: 10
  min_confidence: 0.4
  max_lost_frames: 25
  smoothing: 0.3

# Appearance events
events:
  reprint_secs: 10.0

# Output streams
stream:
  jpeg_quality: 70
  frame_interval_ms: 33
  snapshot_interval_ms: 100
  idle_poll_ms: 200
  acquire_retry_ms: 50
  fps_window: 30
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.marker.registry.len(), 14);
        assert_eq!(config.hand.every_n, 3);
    }

    #[test]
    fn test_validate_rejects_zero_decimation() {
        let mut config = Config::default();
        config.marker.every_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_smoothing() {
        let mut config = Config::default();
        config.tracking.smoothing = 1.0;
        assert!(config.validate().is_err());
        config.tracking.smoothing = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_registry() {
        let mut config = Config::default();
        config.marker.registry = ToolRegistry::empty();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.camera.index = 2;
        config.tracking.max_lost_frames = 40;
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.camera.index, 2);
        assert_eq!(loaded.tracking.max_lost_frames, 40);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("camera:\n  index: 1\n  width: 1280\n  height: 720\n  fps: 60.0\n")
            .unwrap();
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.tracking.history_size, DEFAULT_HISTORY_SIZE);
    }
}
