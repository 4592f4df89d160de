//! Averaged frame records.
//!
//! A frame is one averaged, timestamped reduction of the raw samples that
//! arrived within a frame period. Frames are immutable once appended to a
//! session; per-frame statistics here feed the live display and the report
//! exporter.

use crate::source::types::{Orientation, CHANNEL_COUNT};
use crate::zones::NOISE_FLOOR_KPA;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured frame as built by the scheduler, before the session assigns
/// its index.
#[derive(Debug, Clone)]
pub struct FrameDraft {
    /// Capture instant (the frame-emission firing time).
    pub timestamp: DateTime<Utc>,
    /// Averaged channel readings, truncated toward zero.
    pub channels: Vec<u16>,
    /// Hand orientation at the capture instant.
    pub orientation: Orientation,
    /// Opaque activity label, if the feed reported one.
    pub pattern_tag: Option<String>,
    /// Frame period in force when this frame was captured.
    pub period_ms: u32,
    /// How many raw samples were folded into this frame.
    pub samples_averaged: u32,
}

/// One averaged, timestamped record in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sequential index within the session, starting at 0.
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<u16>,
    pub orientation: Orientation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_tag: Option<String>,
    pub period_ms: u32,
    pub samples_averaged: u32,
}

impl Frame {
    pub(crate) fn from_draft(index: u64, draft: FrameDraft) -> Self {
        Self {
            index,
            timestamp: draft.timestamp,
            channels: draft.channels,
            orientation: draft.orientation,
            pattern_tag: draft.pattern_tag,
            period_ms: draft.period_ms,
            samples_averaged: draft.samples_averaged,
        }
    }

    /// Highest channel reading in this frame.
    pub fn peak(&self) -> u16 {
        self.channels.iter().copied().max().unwrap_or(0)
    }

    /// Channels above the noise floor.
    pub fn active_channel_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|&&v| f64::from(v) > NOISE_FLOOR_KPA)
            .count()
    }

    /// Mean pressure over active channels, or 0.0 when nothing is touching.
    pub fn active_mean(&self) -> f64 {
        let active: Vec<u16> = self
            .channels
            .iter()
            .copied()
            .filter(|&v| f64::from(v) > NOISE_FLOOR_KPA)
            .collect();
        if active.is_empty() {
            return 0.0;
        }
        active.iter().map(|&v| f64::from(v)).sum::<f64>() / active.len() as f64
    }

    /// Wall-clock span this frame covers, in seconds.
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.period_ms) / 1000.0
    }
}
