//! Synthetic sample feed.
//!
//! Yields flat, deterministic readings so the pipeline can run without
//! hardware. Not a waveform simulator; it exists for the CLI demo mode and
//! for exercising pause/resume/disconnect behavior in tests.

use crate::source::types::{Orientation, RawSample};
use crate::source::SampleSource;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

/// Shared control over a [`SyntheticSource`] from another thread.
///
/// The scheduler owns the source itself; tests and the CLI keep a handle to
/// flip connectivity or adjust the pressure level while the pipeline runs.
#[derive(Debug, Clone)]
pub struct SyntheticHandle {
    connected: Arc<AtomicBool>,
    level: Arc<AtomicU16>,
}

impl SyntheticHandle {
    /// Simulate plugging or unplugging the sensor.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Change the pressure level reported on every channel.
    pub fn set_level(&self, level: u16) {
        self.level.store(level, Ordering::SeqCst);
    }
}

/// A feed reporting the same pressure on every channel.
pub struct SyntheticSource {
    connected: Arc<AtomicBool>,
    level: Arc<AtomicU16>,
    orientation: Orientation,
    pattern_tag: Option<String>,
}

impl SyntheticSource {
    /// Create a connected source reporting `level` kPa on all channels.
    pub fn new(level: u16) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
            level: Arc::new(AtomicU16::new(level)),
            orientation: Orientation::default(),
            pattern_tag: None,
        }
    }

    /// Tag emitted frames with an activity label.
    pub fn with_pattern_tag(mut self, tag: impl Into<String>) -> Self {
        self.pattern_tag = Some(tag.into());
        self
    }

    /// Report a fixed hand orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Handle for controlling this source after it moves into the scheduler.
    pub fn handle(&self) -> SyntheticHandle {
        SyntheticHandle {
            connected: self.connected.clone(),
            level: self.level.clone(),
        }
    }
}

impl SampleSource for SyntheticSource {
    fn sample(&mut self) -> Option<RawSample> {
        if !self.connected.load(Ordering::SeqCst) {
            return None;
        }
        Some(RawSample::flat(self.level.load(Ordering::SeqCst)))
    }

    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn pattern_tag(&self) -> Option<String> {
        self.pattern_tag.clone()
    }
}
