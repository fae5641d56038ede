//! Surgical tool tracking application for real-time instrument monitoring.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use surgi_track::capture::CameraSource;
use surgi_track::config::Config;
use surgi_track::oracles::{ArucoMarkerOracle, OnnxHandOracle};
use surgi_track::outputs::{FrameSink, JsonLineSink, MediaPusher, SnapshotPusher};
use surgi_track::pipeline::Pipeline;
use surgi_track::publisher::{PipelineControl, Publisher};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// GUI display mode (cam, none)
    #[arg(short, long, default_value = "cam")]
    gui: String,

    /// Print snapshots as JSON lines to stdout
    #[arg(long)]
    print_snapshots: bool,

    /// Start with the pipeline deactivated (idle until started)
    #[arg(long)]
    paused: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,
}

/// Frame consumer displaying the annotated stream in an `OpenCV` window
struct WindowSink {
    title: String,
    control: Arc<PipelineControl>,
    created: bool,
}

impl WindowSink {
    fn new(control: Arc<PipelineControl>) -> Self {
        Self {
            title: "Surgical Tool Tracking".to_string(),
            control,
            created: false,
        }
    }
}

impl FrameSink for WindowSink {
    fn name(&self) -> &str {
        "window"
    }

    fn push_frame(&mut self, encoded: &Arc<Vec<u8>>) -> surgi_track::Result<()> {
        use opencv::core::Vector;
        use opencv::{highgui, imgcodecs};

        if !self.created {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.created = true;
        }

        let buffer = Vector::from_slice(encoded.as_slice());
        let frame = imgcodecs::imdecode(&buffer, imgcodecs::IMREAD_COLOR)?;
        highgui::imshow(&self.title, &frame)?;

        let key = highgui::wait_key(1)?;
        if key == 27 || key == i32::from(b'q') {
            info!("Exit requested by user");
            self.control.shutdown();
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Surgical Tool Tracking");

    // Load configuration
    let mut config = if let Some(path) = &args.config {
        info!("Loading configuration from: {path}");
        Config::from_file(path).with_context(|| format!("failed to load config {path}"))?
    } else {
        Config::default()
    };
    config.camera.index = args.cam;
    config.validate().context("invalid configuration")?;

    // Device initialization failure is fatal: without a frame source the
    // pipeline loop must not be entered
    let source = match CameraSource::open(&config.camera) {
        Ok(source) => source,
        Err(e) => {
            error!("Could not open camera {}: {e}", config.camera.index);
            return Err(e.into());
        }
    };

    let hand_oracle = OnnxHandOracle::new(&config.models.hand_landmarks, config.models.hand_score_threshold)
        .context("failed to load hand landmark model")?;
    let marker_oracle = ArucoMarkerOracle::new().context("failed to initialize marker detector")?;

    let publisher = Publisher::new();
    let control = PipelineControl::new();

    // Consumer tasks poll the publisher at their own cadence
    let media = MediaPusher::new(
        publisher.clone(),
        control.clone(),
        Duration::from_millis(config.stream.frame_interval_ms),
    );
    let snapshots = SnapshotPusher::new(
        publisher.clone(),
        control.clone(),
        Duration::from_millis(config.stream.snapshot_interval_ms),
    );

    if args.gui == "cam" {
        media.attach(Box::new(WindowSink::new(control.clone())));
    }
    if args.print_snapshots {
        snapshots.attach(Box::new(JsonLineSink::stdout()));
    }

    let media_task = media.spawn();
    let snapshot_task = snapshots.spawn();

    let pipeline = Pipeline::new(
        Box::new(source),
        Box::new(hand_oracle),
        Box::new(marker_oracle),
        &config,
        publisher,
        control.clone(),
    );

    if !args.paused {
        control.start();
    }

    let pipeline_task = std::thread::spawn(move || pipeline.run());

    pipeline_task.join().expect("pipeline thread panicked");
    media_task.join().expect("media pusher thread panicked");
    snapshot_task.join().expect("snapshot pusher thread panicked");

    info!("Application shutting down");
    Ok(())
}
