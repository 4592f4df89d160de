//! Raw sample feeds for the acquisition pipeline.
//!
//! A [`SampleSource`] stands in for the sensor hardware: on each sampler tick
//! the scheduler asks it for one reading. Yielding `None` signals a
//! disconnected feed, which the scheduler treats as pause-equivalent.

pub mod synthetic;
pub mod types;

pub use synthetic::{SyntheticHandle, SyntheticSource};
pub use types::{Orientation, RawSample, CHANNEL_COUNT};

/// A feed of raw pressure readings.
///
/// Implementations must not block: the scheduler polls on its hot path.
pub trait SampleSource: Send {
    /// Obtain one raw sample, or `None` if the feed is disconnected.
    fn sample(&mut self) -> Option<RawSample>;

    /// Current hand orientation, snapshotted at frame-emission time.
    fn orientation(&self) -> Orientation {
        Orientation::default()
    }

    /// Opaque label for the activity pattern in progress, if any.
    fn pattern_tag(&self) -> Option<String> {
        None
    }
}
