//! Tactile Recorder - Acquisition and recording pipeline for tactile
//! pressure sessions.
//!
//! This library ingests a continuous 65-channel pressure stream at a fixed
//! 50 ms cadence, reduces it to averaged frames at an operator-adjustable
//! period (20–5000 ms), and records the frames into bounded sessions that
//! can be saved, reloaded, and exported for clinical review.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Tactile Recorder                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────────┐        │
//! │  │   Sample   │──▶│ Aggregator │──▶│   Recording    │        │
//! │  │   Source   │   │ (avg/frame)│   │    Session     │        │
//! │  └────────────┘   └────────────┘   └────────────────┘        │
//! │        │                │                  │                 │
//! │        └── scheduler ───┘                  ▼                 │
//! │        (50 ms sampler + frame tick) ┌────────────────┐       │
//! │                                     │    Session     │       │
//! │  ┌────────────┐                     │    Document    │       │
//! │  │   Zones    │◀── exports ─────────│  (JSON / CSV)  │       │
//! │  │ (classify) │                     └────────────────┘       │
//! │  └────────────┘                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tactile_recorder::scheduler::AcquisitionScheduler;
//! use tactile_recorder::session::{
//!     MetadataDraft, RecordingSession, SessionMode, TreatmentLocation,
//! };
//! use tactile_recorder::source::SyntheticSource;
//! use tactile_recorder::FrameAggregator;
//!
//! let scheduler = AcquisitionScheduler::new(
//!     Box::new(SyntheticSource::new(35)),
//!     RecordingSession::new(),
//!     FrameAggregator::new(),
//!     50,
//! )
//! .expect("valid frame period");
//!
//! let draft = MetadataDraft {
//!     subject_id: "PT-1042".into(),
//!     location: Some(TreatmentLocation::LowerBack),
//!     operator_id: "OP-7".into(),
//!     mode: Some(SessionMode::ProtocolDevelopment),
//!     ..MetadataDraft::default()
//! };
//! let metadata = scheduler
//!     .start_session(draft)
//!     .expect("complete metadata");
//! println!("recording {}", metadata.session_id);
//!
//! // Averaged frames arrive on scheduler.frames()
//! ```

pub mod config;
pub mod core;
pub mod document;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod zones;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{Frame, FrameAggregator, FrameDraft};
pub use document::{DocumentError, SessionDocument, SessionSummary};
pub use scheduler::{AcquisitionScheduler, SchedulerError};
pub use session::{
    MetadataDraft, RecordingSession, SessionError, SessionMetadata, SessionState, StopDecision,
};
pub use source::{RawSample, SampleSource, SyntheticSource};
pub use zones::{PressureZone, ZoneError, ZoneThresholds};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
