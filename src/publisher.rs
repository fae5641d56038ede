//! Shared-state handoff between the pipeline and its consumers.
//!
//! The `Publisher` owns two independently guarded slots: the latest
//! encoded frame and the latest snapshot. Each publish is an atomic
//! whole-value replace, so a reader sees either the prior value or the
//! new one, never a mixture. Neither slot blocks on the other, and a
//! slow or absent reader never slows the producer (last-value-wins).

use crate::snapshot::Snapshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-producer, multi-reader store for the latest published values
pub struct Publisher {
    frame: Mutex<Option<Arc<Vec<u8>>>>,
    snapshot: Mutex<Option<Arc<Snapshot>>>,
}

impl Publisher {
    /// Create an empty publisher
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frame: Mutex::new(None),
            snapshot: Mutex::new(None),
        })
    }

    /// Replace the latest encoded frame
    pub fn publish_frame(&self, encoded: Vec<u8>) {
        *self.frame.lock() = Some(Arc::new(encoded));
    }

    /// Replace the latest snapshot
    pub fn publish_snapshot(&self, snapshot: Snapshot) {
        *self.snapshot.lock() = Some(Arc::new(snapshot));
    }

    /// The latest encoded frame, if anything has been published
    #[must_use]
    pub fn latest_frame(&self) -> Option<Arc<Vec<u8>>> {
        self.frame.lock().clone()
    }

    /// The latest snapshot, if anything has been published
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.lock().clone()
    }

    /// Empty both slots. Used when the pipeline is deactivated.
    pub fn clear(&self) {
        *self.frame.lock() = None;
        *self.snapshot.lock() = None;
    }
}

/// Control surface shared between an external controller and the
/// pipeline loop.
///
/// The activation flag is the only state the two share; reactivation is
/// observed by the loop within one idle-poll interval. Shutdown is a
/// separate, terminal signal for orderly process exit.
pub struct PipelineControl {
    active: AtomicBool,
    shutdown: AtomicBool,
}

impl PipelineControl {
    /// Create a control handle, initially deactivated
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Activate the pipeline
    pub fn start(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Deactivate the pipeline; the loop idles until restarted
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Whether the pipeline is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Request the pipeline loop and pusher tasks to exit
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_first_publish() {
        let publisher = Publisher::new();
        assert!(publisher.latest_frame().is_none());
        assert!(publisher.latest_snapshot().is_none());
    }

    #[test]
    fn test_last_value_wins() {
        let publisher = Publisher::new();
        publisher.publish_frame(vec![1]);
        publisher.publish_frame(vec![2, 3]);
        assert_eq!(*publisher.latest_frame().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_slots_are_independent() {
        let publisher = Publisher::new();
        publisher.publish_frame(vec![9]);
        assert!(publisher.latest_snapshot().is_none());
        assert!(publisher.latest_frame().is_some());
    }

    #[test]
    fn test_clear() {
        let publisher = Publisher::new();
        publisher.publish_frame(vec![1]);
        publisher.clear();
        assert!(publisher.latest_frame().is_none());
    }

    #[test]
    fn test_control_flags() {
        let control = PipelineControl::new();
        assert!(!control.is_active());
        control.start();
        assert!(control.is_active());
        control.stop();
        assert!(!control.is_active());
        assert!(!control.is_shutdown());
        control.shutdown();
        assert!(control.is_shutdown());
    }
}
