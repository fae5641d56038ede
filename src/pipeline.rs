//! The frame-processing pipeline.
//!
//! A single sequential loop: acquire a frame, localize hands (decimated),
//! detect markers within hand regions (decimated), update the tracker,
//! build a snapshot, publish, debounce events. Decimation, not
//! concurrency, is the sole mechanism for bounding cost; no lock is held
//! across an oracle invocation.

use crate::capture::{Frame, FrameSource};
use crate::config::Config;
use crate::events::EventDebouncer;
use crate::hand_localizer::{HandLocalizer, HandRegion};
use crate::marker_detector::MarkerDetector;
use crate::oracles::{HandOracle, MarkerOracle};
use crate::overlay;
use crate::publisher::{PipelineControl, Publisher};
use crate::snapshot::{Snapshot, ToolState};
use crate::tracker::ToolTracker;
use crate::Result;
use log::{info, warn};
use opencv::core::Vector;
use opencv::imgcodecs;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The long-lived frame-processing loop.
///
/// Owns the frame source, both detection adapters, the tracker and the
/// debouncer; publishes through a shared [`Publisher`] and obeys a shared
/// [`PipelineControl`].
pub struct Pipeline {
    source: Box<dyn FrameSource>,
    hands: HandLocalizer,
    markers: MarkerDetector,
    tracker: ToolTracker,
    debouncer: EventDebouncer,
    publisher: Arc<Publisher>,
    control: Arc<PipelineControl>,
    jpeg_quality: i32,
    idle_poll: Duration,
    acquire_retry: Duration,
    fps_window: VecDeque<f64>,
    fps_window_size: usize,
    last_cycle_at: Option<Instant>,
}

impl Pipeline {
    /// Assemble a pipeline from an injected frame source and oracles
    pub fn new(
        source: Box<dyn FrameSource>,
        hand_oracle: Box<dyn HandOracle>,
        marker_oracle: Box<dyn MarkerOracle>,
        config: &Config,
        publisher: Arc<Publisher>,
        control: Arc<PipelineControl>,
    ) -> Self {
        Self {
            source,
            hands: HandLocalizer::new(hand_oracle, &config.hand),
            markers: MarkerDetector::new(marker_oracle, &config.marker),
            tracker: ToolTracker::new(config.tracking.clone()),
            debouncer: EventDebouncer::new(&config.events),
            publisher,
            control,
            jpeg_quality: config.stream.jpeg_quality,
            idle_poll: Duration::from_millis(config.stream.idle_poll_ms),
            acquire_retry: Duration::from_millis(config.stream.acquire_retry_ms),
            fps_window: VecDeque::with_capacity(config.stream.fps_window),
            fps_window_size: config.stream.fps_window.max(1),
            last_cycle_at: None,
        }
    }

    /// Run until shutdown is requested.
    ///
    /// While deactivated the loop idles at a low frequency with the
    /// published slots cleared; reactivation is observed within one idle
    /// poll. Acquisition failures are logged and retried indefinitely;
    /// nothing in the loop is allowed to terminate it.
    pub fn run(mut self) {
        info!("Pipeline loop started");

        while !self.control.is_shutdown() {
            if !self.control.is_active() {
                self.publisher.clear();
                self.last_cycle_at = None;
                std::thread::sleep(self.idle_poll);
                continue;
            }

            let frame = match self.source.acquire() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Frame acquisition failed, retrying: {e}");
                    std::thread::sleep(self.acquire_retry);
                    continue;
                }
            };

            if let Err(e) = self.process(frame) {
                // A bad cycle is isolated; the loop carries on
                warn!("Cycle failed: {e}");
            }
        }

        info!("Pipeline loop stopped");
    }

    /// One pipeline cycle over an acquired frame
    fn process(&mut self, mut frame: Frame) -> Result<()> {
        let now = Instant::now();
        let fps = self.update_fps(now);

        let regions: Vec<HandRegion> = self.hands.update(&frame).to_vec();

        // On non-detection cycles the tracker still advances: every
        // existing id takes a miss
        let candidates = if self.markers.should_run(frame.index) {
            self.markers.detect(&frame, &regions)
        } else {
            Vec::new()
        };
        self.tracker.update(&candidates);

        let stable = self.tracker.stable_tools();

        let events = self.debouncer.update(&stable, now);
        for event in &events {
            info!("DETECTED | ID: {:>2} | {}", event.id, event.label);
        }

        if let Err(e) = overlay::annotate(&mut frame.mat, &regions, &stable, fps) {
            warn!("Overlay drawing failed: {e}");
        }

        let snapshot = Snapshot {
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            fps: (fps * 10.0).round() / 10.0,
            hand_count: regions.len(),
            tools: stable
                .iter()
                .map(|track| ToolState {
                    id: track.id,
                    label: track.label.clone(),
                    confidence: (track.confidence() * 1000.0).round() / 1000.0,
                    status: track.status(),
                })
                .collect(),
            events,
        };

        let mut encoded: Vector<u8> = Vector::new();
        let params = Vector::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, self.jpeg_quality]);
        imgcodecs::imencode(".jpg", &frame.mat, &mut encoded, &params)?;

        // Only the publish step is guarded, and only within its own slot
        self.publisher.publish_frame(encoded.to_vec());
        self.publisher.publish_snapshot(snapshot);

        Ok(())
    }

    /// Push an instantaneous FPS sample and return the window mean
    fn update_fps(&mut self, now: Instant) -> f64 {
        if let Some(last) = self.last_cycle_at {
            let dt = now.duration_since(last).as_secs_f64().max(1e-5);
            if self.fps_window.len() >= self.fps_window_size {
                self.fps_window.pop_front();
            }
            self.fps_window.push_back(1.0 / dt);
        }
        self.last_cycle_at = Some(now);

        if self.fps_window.is_empty() {
            0.0
        } else {
            self.fps_window.iter().sum::<f64>() / self.fps_window.len() as f64
        }
    }
}
