//! Recording sessions: identity metadata plus the lifecycle state machine.

pub mod metadata;
pub mod recording;

// Re-export commonly used types
pub use metadata::{
    ExportPreferences, MetadataDraft, SessionMetadata, SessionMode, TreatmentLocation,
};
pub use recording::{CloseReason, RecordingSession, SessionError, SessionState, StopDecision};
