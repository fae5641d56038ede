//! Consumer-facing output tasks.
//!
//! Two pusher tasks run concurrently with the pipeline and poll the
//! publisher at their own cadence: a continuous media pusher for encoded
//! frames and a change-driven pusher for snapshots. Consumers implement
//! [`FrameSink`] or [`SnapshotSink`] and can attach or detach at any
//! time; a failing sink is unregistered without affecting the producer
//! or other sinks.

use crate::publisher::{PipelineControl, Publisher};
use crate::snapshot::Snapshot;
use crate::{Error, Result};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Consumer of the continuous annotated-frame stream
pub trait FrameSink: Send {
    /// Identifier used in logs and for detaching
    fn name(&self) -> &str;

    /// Deliver the latest encoded frame.
    ///
    /// # Errors
    ///
    /// An error unregisters this sink; other sinks are unaffected.
    fn push_frame(&mut self, encoded: &Arc<Vec<u8>>) -> Result<()>;
}

/// Consumer of the discrete snapshot feed
pub trait SnapshotSink: Send {
    /// Identifier used in logs and for detaching
    fn name(&self) -> &str;

    /// Deliver a snapshot.
    ///
    /// # Errors
    ///
    /// An error unregisters this sink; other sinks are unaffected.
    fn push_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Continuous media pusher.
///
/// Repeatedly reads the latest published frame at a fixed cadence and
/// forwards it to every attached sink; a no-op while nothing has been
/// published.
pub struct MediaPusher {
    publisher: Arc<Publisher>,
    control: Arc<PipelineControl>,
    interval: Duration,
    sinks: Arc<Mutex<Vec<Box<dyn FrameSink>>>>,
}

impl MediaPusher {
    /// Create a pusher polling at the given cadence
    #[must_use]
    pub fn new(publisher: Arc<Publisher>, control: Arc<PipelineControl>, interval: Duration) -> Self {
        Self {
            publisher,
            control,
            interval,
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach a frame consumer
    pub fn attach(&self, sink: Box<dyn FrameSink>) {
        info!("Frame sink attached: {}", sink.name());
        self.sinks.lock().push(sink);
    }

    /// Detach a frame consumer by name
    pub fn detach(&self, name: &str) -> bool {
        let mut sinks = self.sinks.lock();
        let before = sinks.len();
        sinks.retain(|s| s.name() != name);
        before != sinks.len()
    }

    /// Number of attached sinks
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// One polling iteration
    pub fn pump_once(&self) {
        let Some(frame) = self.publisher.latest_frame() else {
            return;
        };
        self.sinks.lock().retain_mut(|sink| match sink.push_frame(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Frame sink {} dropped: {e}", sink.name());
                false
            }
        });
    }

    /// Run the pusher on its own thread until shutdown
    pub fn spawn(&self) -> JoinHandle<()> {
        let pusher = Self {
            publisher: Arc::clone(&self.publisher),
            control: Arc::clone(&self.control),
            interval: self.interval,
            sinks: Arc::clone(&self.sinks),
        };
        thread::spawn(move || {
            while !pusher.control.is_shutdown() {
                pusher.pump_once();
                thread::sleep(pusher.interval);
            }
            info!("Media pusher stopped");
        })
    }
}

struct SnapshotSinkEntry {
    sink: Box<dyn SnapshotSink>,
    last_ids: BTreeSet<i32>,
    last_delivered: Option<Arc<Snapshot>>,
}

/// Change-driven snapshot pusher.
///
/// Reads the latest snapshot at a fixed cadence and forwards it to a sink
/// only when the stable-tool id set changed for that sink or new events
/// are pending.
pub struct SnapshotPusher {
    publisher: Arc<Publisher>,
    control: Arc<PipelineControl>,
    interval: Duration,
    sinks: Arc<Mutex<Vec<SnapshotSinkEntry>>>,
}

impl SnapshotPusher {
    /// Create a pusher polling at the given cadence
    #[must_use]
    pub fn new(publisher: Arc<Publisher>, control: Arc<PipelineControl>, interval: Duration) -> Self {
        Self {
            publisher,
            control,
            interval,
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach a snapshot consumer
    pub fn attach(&self, sink: Box<dyn SnapshotSink>) {
        info!("Snapshot sink attached: {}", sink.name());
        self.sinks.lock().push(SnapshotSinkEntry {
            sink,
            last_ids: BTreeSet::new(),
            last_delivered: None,
        });
    }

    /// Detach a snapshot consumer by name
    pub fn detach(&self, name: &str) -> bool {
        let mut sinks = self.sinks.lock();
        let before = sinks.len();
        sinks.retain(|e| e.sink.name() != name);
        before != sinks.len()
    }

    /// Number of attached sinks
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// One polling iteration
    pub fn pump_once(&self) {
        let Some(snapshot) = self.publisher.latest_snapshot() else {
            return;
        };
        self.sinks.lock().retain_mut(|entry| {
            // Each published snapshot is considered once per sink
            if entry
                .last_delivered
                .as_ref()
                .is_some_and(|prev| Arc::ptr_eq(prev, &snapshot))
            {
                return true;
            }

            let ids = snapshot.stable_ids();
            let changed = ids != entry.last_ids || !snapshot.events.is_empty();
            entry.last_delivered = Some(Arc::clone(&snapshot));
            if !changed {
                return true;
            }

            match entry.sink.push_snapshot(&snapshot) {
                Ok(()) => {
                    entry.last_ids = ids;
                    true
                }
                Err(e) => {
                    warn!("Snapshot sink {} dropped: {e}", entry.sink.name());
                    false
                }
            }
        });
    }

    /// Run the pusher on its own thread until shutdown
    pub fn spawn(&self) -> JoinHandle<()> {
        let pusher = Self {
            publisher: Arc::clone(&self.publisher),
            control: Arc::clone(&self.control),
            interval: self.interval,
            sinks: Arc::clone(&self.sinks),
        };
        thread::spawn(move || {
            while !pusher.control.is_shutdown() {
                pusher.pump_once();
                thread::sleep(pusher.interval);
            }
            info!("Snapshot pusher stopped");
        })
    }
}

/// Snapshot sink writing one JSON document per line
pub struct JsonLineSink<W: Write + Send> {
    name: String,
    writer: W,
}

impl JsonLineSink<std::io::Stdout> {
    /// JSON-lines sink on standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            name: "stdout".to_string(),
            writer: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> JsonLineSink<W> {
    /// JSON-lines sink on an arbitrary writer
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }
}

impl<W: Write + Send> SnapshotSink for JsonLineSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let line = serde_json::to_string(snapshot).map_err(|e| Error::Sink(e.to_string()))?;
        writeln!(self.writer, "{line}").map_err(|e| Error::Sink(e.to_string()))?;
        Ok(())
    }
}
