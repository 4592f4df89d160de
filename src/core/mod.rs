//! Core aggregation pipeline.
//!
//! This module contains:
//! - Frame aggregation (buffer raw samples, reduce to an averaged frame)
//! - The frame record type and its per-frame statistics

pub mod aggregate;
pub mod frame;

// Re-export commonly used types
pub use aggregate::FrameAggregator;
pub use frame::{Frame, FrameDraft};
