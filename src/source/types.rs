//! Raw sensor reading types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of pressure channels on the glove (13 taxels per finger, 5 fingers).
pub const CHANNEL_COUNT: usize = 65;

/// One fixed-cadence reading of all pressure channels, pre-averaging.
///
/// Ephemeral: owned by the acquisition scheduler until folded into a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Non-negative pressure readings in kPa, one per channel.
    pub channels: Vec<u16>,
}

impl RawSample {
    /// Create a sample from channel readings, padding or truncating to
    /// [`CHANNEL_COUNT`] so downstream math never sees a ragged sample.
    pub fn new(mut channels: Vec<u16>) -> Self {
        channels.resize(CHANNEL_COUNT, 0);
        Self {
            timestamp: Utc::now(),
            channels,
        }
    }

    /// A sample with every channel at the given level.
    pub fn flat(level: u16) -> Self {
        Self::new(vec![level; CHANNEL_COUNT])
    }
}

/// Hand orientation in degrees, snapshotted alongside each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Orientation {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}
