//! Raw sample accumulation and reduction.
//!
//! The aggregator buffers raw samples pushed at the sampler's cadence and
//! reduces them to one averaged reading per frame boundary. It knows nothing
//! about sessions or timing; the scheduler decides when to push, drain, or
//! discard.

use crate::source::types::{RawSample, CHANNEL_COUNT};

/// Accumulates raw samples between frame boundaries.
#[derive(Debug)]
pub struct FrameAggregator {
    /// Per-channel running sums for the pending window.
    sums: Vec<u64>,
    /// Samples folded into `sums` since the last drain or discard.
    pending: u32,
    /// Most recent reading: the last raw sample pushed or the last averaged
    /// result drained, whichever came later. Re-emitted on an empty drain so
    /// a frame never fabricates a false zero reading.
    last: Option<Vec<u16>>,
}

impl Default for FrameAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAggregator {
    pub fn new() -> Self {
        Self {
            sums: vec![0; CHANNEL_COUNT],
            pending: 0,
            last: None,
        }
    }

    /// Append one raw sample to the pending window. Never fails or blocks.
    pub fn push(&mut self, sample: RawSample) {
        for (sum, &value) in self.sums.iter_mut().zip(sample.channels.iter()) {
            *sum += u64::from(value);
        }
        self.pending += 1;
        self.last = Some(sample.channels);
    }

    /// Number of samples currently buffered.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Reduce the pending window to an element-wise mean, truncated toward
    /// zero, and clear the buffer.
    ///
    /// An empty drain (no samples arrived within the frame period) returns
    /// the last known reading with a count of 0, so a frame is still emitted
    /// without inventing data. Before any reading exists, it returns zeros.
    pub fn drain(&mut self) -> (Vec<u16>, u32) {
        if self.pending == 0 {
            let channels = self
                .last
                .clone()
                .unwrap_or_else(|| vec![0; CHANNEL_COUNT]);
            return (channels, 0);
        }

        let count = self.pending;
        let channels: Vec<u16> = self
            .sums
            .iter()
            .map(|&sum| (sum / u64::from(count)) as u16)
            .collect();

        self.sums.fill(0);
        self.pending = 0;
        self.last = Some(channels.clone());
        (channels, count)
    }

    /// Drop the pending window without emitting it.
    ///
    /// Used on pause and disconnect so resuming starts a fresh averaging
    /// window instead of blending pre- and post-pause samples.
    pub fn discard(&mut self) {
        self.sums.fill(0);
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_channel_sample(value: u16) -> RawSample {
        RawSample::new(vec![value])
    }

    #[test]
    fn test_drain_computes_truncated_mean() {
        let mut agg = FrameAggregator::new();
        agg.push(single_channel_sample(10));
        agg.push(single_channel_sample(20));
        agg.push(single_channel_sample(30));

        let (channels, count) = agg.drain();
        assert_eq!(channels[0], 20);
        assert_eq!(count, 3);
        assert_eq!(agg.pending(), 0);
    }

    #[test]
    fn test_mean_truncates_toward_zero() {
        let mut agg = FrameAggregator::new();
        agg.push(single_channel_sample(10));
        agg.push(single_channel_sample(11));

        // 10.5 truncates to 10
        let (channels, count) = agg.drain();
        assert_eq!(channels[0], 10);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_empty_drain_reemits_last_reading() {
        let mut agg = FrameAggregator::new();
        agg.push(single_channel_sample(10));
        agg.push(single_channel_sample(20));
        agg.push(single_channel_sample(30));

        let (first, n1) = agg.drain();
        assert_eq!((first[0], n1), (20, 3));

        // Nothing pushed since: same value, zero samples averaged.
        let (second, n2) = agg.drain();
        assert_eq!(second[0], 20);
        assert_eq!(n2, 0);
    }

    #[test]
    fn test_drain_before_any_sample_is_zeros() {
        let mut agg = FrameAggregator::new();
        let (channels, count) = agg.drain();
        assert_eq!(count, 0);
        assert!(channels.iter().all(|&v| v == 0));
        assert_eq!(channels.len(), CHANNEL_COUNT);
    }

    #[test]
    fn test_discard_clears_without_emitting() {
        let mut agg = FrameAggregator::new();
        agg.push(single_channel_sample(40));
        agg.push(single_channel_sample(50));
        agg.discard();

        assert_eq!(agg.pending(), 0);
        // The discarded window must not leak into the next average.
        agg.push(single_channel_sample(10));
        let (channels, count) = agg.drain();
        assert_eq!(channels[0], 10);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_elementwise_mean_across_channels() {
        let mut agg = FrameAggregator::new();
        agg.push(RawSample::new(vec![10, 100]));
        agg.push(RawSample::new(vec![30, 200]));

        let (channels, count) = agg.drain();
        assert_eq!(count, 2);
        assert_eq!(channels[0], 20);
        assert_eq!(channels[1], 150);
        assert_eq!(channels[2], 0);
    }
}
