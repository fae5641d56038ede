//! Constants used throughout the application

/// Number of landmarks in a hand landmark set
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Default camera frame size
pub const DEFAULT_FRAME_WIDTH: i32 = 640;
pub const DEFAULT_FRAME_HEIGHT: i32 = 480;

/// Hand localization runs once every N pipeline cycles
pub const DEFAULT_HAND_EVERY_N: u64 = 3;

/// Marker detection runs once every N pipeline cycles
pub const DEFAULT_MARKER_EVERY_N: u64 = 2;

/// Downscale factor applied to the frame before hand localization
pub const DEFAULT_HAND_SCALE: f64 = 0.5;

/// Padding added around a hand bounding box, in pixels.
/// Captures tool tips extending past the hand silhouette.
pub const DEFAULT_HAND_PADDING: i32 = 120;

/// Minimum working resolution for a hand region before marker detection
pub const DEFAULT_UPSCALE_TARGET: i32 = 380;

/// Minimum corner-polygon perimeter for an accepted marker, in pixels
/// of the processed (possibly upscaled) region
pub const DEFAULT_MIN_MARKER_PERIMETER: f64 = 15.0;

/// Hit/miss detection history window per track
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Tracks below this confidence are dropped
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;

/// Tracks lost for more than this many cycles are dropped
pub const DEFAULT_MAX_LOST_FRAMES: u64 = 25;

/// Exponential smoothing factor for track centers.
/// Weights the previous smoothed value; lower is more responsive.
pub const DEFAULT_POSITION_SMOOTHING: f64 = 0.3;

/// Seconds a tool must be absent before its reappearance is announced again
pub const DEFAULT_REPRINT_SECS: f64 = 10.0;

/// Local contrast normalization parameters (CLAHE)
pub const CLAHE_CLIP_LIMIT: f64 = 2.0;
pub const CLAHE_TILE_SIZE: i32 = 4;

/// Number of samples in the published FPS average
pub const DEFAULT_FPS_WINDOW: usize = 30;

/// JPEG quality for published annotated frames
pub const DEFAULT_JPEG_QUALITY: i32 = 70;

/// Cadence of the continuous media pusher, in milliseconds
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// Cadence of the change-driven snapshot pusher, in milliseconds
pub const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 100;

/// Sleep between activation checks while the pipeline is deactivated
pub const DEFAULT_IDLE_POLL_MS: u64 = 200;

/// Backoff after a failed frame acquisition
pub const DEFAULT_ACQUIRE_RETRY_MS: u64 = 50;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
