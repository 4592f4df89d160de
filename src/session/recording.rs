//! Recording session state machine.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Recording <-> Paused -> Closed(Saved | Discarded)
//! ```
//!
//! Frames are appended only while Recording, and the session assigns each
//! frame its index, so indices are monotonic by construction. Closing is
//! terminal for the session's identity: `start` after a close begins a
//! brand-new session (fresh id, empty frame list) rather than extending the
//! old one.

use crate::core::frame::{Frame, FrameDraft};
use crate::session::metadata::{generate_session_id, MetadataDraft, SessionMetadata};
use chrono::Utc;
use thiserror::Error;

/// Why a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Saved,
    Discarded,
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Closed(CloseReason),
}

/// Operator decision when stopping a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    Save,
    Discard,
}

/// Errors from session transitions.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// A required metadata field is missing; the session was not created.
    #[error("incomplete session metadata: {0}")]
    IncompleteMetadata(&'static str),

    /// A session is already open; stop or discard it first.
    #[error("a session is already in progress")]
    AlreadyStarted,

    /// Frame append or pause attempted outside the Recording state.
    #[error("session is not recording")]
    NotRecording,

    /// Resume attempted when no paused session exists.
    #[error("session is not paused")]
    NotPaused,

    /// The session reached a terminal state; construct a new one.
    #[error("session is closed")]
    SessionClosed,

    /// Stop-and-save requested with zero captured frames. Advisory: the
    /// caller decides whether to discard instead.
    #[error("session has no captured frames to save")]
    EmptySession,
}

/// One bounded recording from start to stop/discard.
///
/// Owns its metadata and its ordered, append-only frame list.
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    metadata: Option<SessionMetadata>,
    frames: Vec<Frame>,
    saved: bool,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    /// Create an idle session holder with no identity yet.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            metadata: None,
            frames: Vec::new(),
            saved: false,
        }
    }

    /// Reconstruct a session from persisted parts, already closed and saved.
    ///
    /// This is the reload contract: frames are reviewable and exportable,
    /// but no further frame can be appended and the session cannot resume.
    pub fn from_saved_parts(metadata: SessionMetadata, frames: Vec<Frame>) -> Self {
        Self {
            state: SessionState::Closed(CloseReason::Saved),
            metadata: Some(metadata),
            frames,
            saved: true,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed(_))
    }

    /// Whether this session's data has been persisted.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.metadata.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Recorded span in seconds, summing the period each frame was actually
    /// captured with. Correct even if the period changed mid-session.
    pub fn duration_secs(&self) -> f64 {
        self.frames.iter().map(Frame::duration_secs).sum()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Begin a new session: validate the draft, generate an identity, and
    /// enter Recording with an empty frame list.
    ///
    /// Allowed from Idle, or after a previous session closed. In the latter
    /// case the prior metadata and frames are dropped first, so a saved
    /// session can never silently accumulate frames under a new identity.
    pub fn start(&mut self, draft: MetadataDraft) -> Result<&SessionMetadata, SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Closed(_) => {}
            SessionState::Recording | SessionState::Paused => {
                return Err(SessionError::AlreadyStarted)
            }
        }

        let subject_id = draft.subject_id.trim();
        if subject_id.is_empty() {
            return Err(SessionError::IncompleteMetadata("subject_id"));
        }
        let operator_id = draft.operator_id.trim();
        if operator_id.is_empty() {
            return Err(SessionError::IncompleteMetadata("operator_id"));
        }
        let location = draft
            .location
            .ok_or(SessionError::IncompleteMetadata("location"))?;
        let mode = draft.mode.ok_or(SessionError::IncompleteMetadata("mode"))?;

        let created_at = Utc::now();
        self.metadata = Some(SessionMetadata {
            session_id: generate_session_id(created_at),
            created_at,
            subject_id: subject_id.to_string(),
            location,
            operator_id: operator_id.to_string(),
            assistant_id: draft.assistant_id.filter(|a| !a.trim().is_empty()),
            mode,
            notes: draft.notes.filter(|n| !n.trim().is_empty()),
            export_preferences: draft.export_preferences,
        });
        self.frames.clear();
        self.saved = false;
        self.state = SessionState::Recording;

        Ok(self.metadata.as_ref().expect("metadata just set"))
    }

    /// Append a captured frame, assigning the next sequential index.
    pub fn append_frame(&mut self, draft: FrameDraft) -> Result<&Frame, SessionError> {
        match self.state {
            SessionState::Recording => {}
            SessionState::Closed(_) => return Err(SessionError::SessionClosed),
            SessionState::Idle | SessionState::Paused => return Err(SessionError::NotRecording),
        }

        let index = self.frames.len() as u64;
        self.frames.push(Frame::from_draft(index, draft));
        Ok(self.frames.last().expect("frame just pushed"))
    }

    /// Recording -> Paused. No frames are appended while paused.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording => {
                self.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Closed(_) => Err(SessionError::SessionClosed),
            SessionState::Idle | SessionState::Paused => Err(SessionError::NotRecording),
        }
    }

    /// Paused -> Recording, only while the session has not been saved.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Paused if !self.saved => {
                self.state = SessionState::Recording;
                Ok(())
            }
            SessionState::Paused | SessionState::Closed(_) => Err(SessionError::SessionClosed),
            SessionState::Idle | SessionState::Recording => Err(SessionError::NotPaused),
        }
    }

    /// Close the session from Recording or Paused.
    ///
    /// `Save` requires at least one captured frame and marks the session
    /// saved; `Discard` clears metadata and frames unconditionally.
    pub fn stop(&mut self, decision: StopDecision) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording | SessionState::Paused => {}
            SessionState::Closed(_) => return Err(SessionError::SessionClosed),
            SessionState::Idle => return Err(SessionError::NotRecording),
        }

        match decision {
            StopDecision::Save => {
                if self.frames.is_empty() {
                    return Err(SessionError::EmptySession);
                }
                self.saved = true;
                self.state = SessionState::Closed(CloseReason::Saved);
            }
            StopDecision::Discard => {
                self.metadata = None;
                self.frames.clear();
                self.state = SessionState::Closed(CloseReason::Discarded);
            }
        }
        Ok(())
    }

    /// Edit the clinical notes. Identity fields are immutable, but notes
    /// stay editable until the session closes.
    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::SessionClosed);
        }
        match self.metadata.as_mut() {
            Some(meta) => {
                meta.notes = notes.filter(|n| !n.trim().is_empty());
                Ok(())
            }
            None => Err(SessionError::NotRecording),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::metadata::{ExportPreferences, SessionMode, TreatmentLocation};
    use crate::source::types::Orientation;

    fn draft() -> MetadataDraft {
        MetadataDraft {
            subject_id: "PT-1042".into(),
            location: Some(TreatmentLocation::LeftShoulder),
            operator_id: "OP-7".into(),
            assistant_id: None,
            mode: Some(SessionMode::ProtocolDevelopment),
            notes: None,
            export_preferences: ExportPreferences::default(),
        }
    }

    fn frame_draft(level: u16) -> FrameDraft {
        FrameDraft {
            timestamp: Utc::now(),
            channels: vec![level; 65],
            orientation: Orientation::default(),
            pattern_tag: None,
            period_ms: 50,
            samples_averaged: 1,
        }
    }

    #[test]
    fn test_start_requires_subject_id() {
        let mut session = RecordingSession::new();
        let mut d = draft();
        d.subject_id = "  ".into();

        let err = session.start(d).unwrap_err();
        assert_eq!(err, SessionError::IncompleteMetadata("subject_id"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.metadata().is_none());
    }

    #[test]
    fn test_start_requires_operator_and_location() {
        let mut session = RecordingSession::new();

        let mut d = draft();
        d.operator_id = String::new();
        assert_eq!(
            session.start(d).unwrap_err(),
            SessionError::IncompleteMetadata("operator_id")
        );

        let mut d = draft();
        d.location = None;
        assert_eq!(
            session.start(d).unwrap_err(),
            SessionError::IncompleteMetadata("location")
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_append_assigns_monotonic_indices() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();

        for level in [10, 20, 30] {
            session.append_frame(frame_draft(level)).unwrap();
        }

        let indices: Vec<u64> = session.frames().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_append_outside_recording_fails() {
        let mut session = RecordingSession::new();
        assert_eq!(
            session.append_frame(frame_draft(10)).unwrap_err(),
            SessionError::NotRecording
        );

        session.start(draft()).unwrap();
        session.pause().unwrap();
        assert_eq!(
            session.append_frame(frame_draft(10)).unwrap_err(),
            SessionError::NotRecording
        );

        session.resume().unwrap();
        session.append_frame(frame_draft(10)).unwrap();
        session.stop(StopDecision::Save).unwrap();
        assert_eq!(
            session.append_frame(frame_draft(10)).unwrap_err(),
            SessionError::SessionClosed
        );
    }

    #[test]
    fn test_pause_resume_keeps_index_sequence() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();

        session.append_frame(frame_draft(10)).unwrap();
        session.pause().unwrap();
        session.resume().unwrap();
        session.append_frame(frame_draft(20)).unwrap();
        session.append_frame(frame_draft(30)).unwrap();

        assert_eq!(session.frame_count(), 3);
        let indices: Vec<u64> = session.frames().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_save_with_zero_frames_is_advisory() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();

        assert_eq!(
            session.stop(StopDecision::Save).unwrap_err(),
            SessionError::EmptySession
        );
        // Session still open; the caller may discard instead.
        assert_eq!(session.state(), SessionState::Recording);
        session.stop(StopDecision::Discard).unwrap();
        assert_eq!(
            session.state(),
            SessionState::Closed(CloseReason::Discarded)
        );
        assert!(session.metadata().is_none());
        assert!(session.frames().is_empty());
    }

    #[test]
    fn test_resume_after_close_fails() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();
        session.append_frame(frame_draft(10)).unwrap();
        session.stop(StopDecision::Save).unwrap();
        assert_eq!(session.resume().unwrap_err(), SessionError::SessionClosed);

        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();
        session.stop(StopDecision::Discard).unwrap();
        assert_eq!(session.resume().unwrap_err(), SessionError::SessionClosed);
    }

    #[test]
    fn test_start_after_saved_session_is_fresh() {
        let mut session = RecordingSession::new();
        let first_id = session.start(draft()).unwrap().session_id.clone();
        session.append_frame(frame_draft(10)).unwrap();
        session.stop(StopDecision::Save).unwrap();

        let second_id = session.start(draft()).unwrap().session_id.clone();
        assert_ne!(first_id, second_id);
        assert!(session.frames().is_empty());
        assert!(!session.is_saved());
        assert_eq!(session.state(), SessionState::Recording);
    }

    #[test]
    fn test_start_while_open_fails() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();
        assert_eq!(
            session.start(draft()).unwrap_err(),
            SessionError::AlreadyStarted
        );

        session.pause().unwrap();
        assert_eq!(
            session.start(draft()).unwrap_err(),
            SessionError::AlreadyStarted
        );
    }

    #[test]
    fn test_loaded_session_is_closed_saved() {
        let mut live = RecordingSession::new();
        let metadata = live.start(draft()).unwrap().clone();
        live.append_frame(frame_draft(25)).unwrap();
        let frames = live.frames().to_vec();

        let mut loaded = RecordingSession::from_saved_parts(metadata, frames);
        assert_eq!(loaded.state(), SessionState::Closed(CloseReason::Saved));
        assert!(loaded.is_saved());
        assert_eq!(loaded.frame_count(), 1);
        assert_eq!(
            loaded.append_frame(frame_draft(10)).unwrap_err(),
            SessionError::SessionClosed
        );
        assert_eq!(loaded.resume().unwrap_err(), SessionError::SessionClosed);
    }

    #[test]
    fn test_duration_is_period_aware() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();

        let mut d = frame_draft(10);
        d.period_ms = 100;
        session.append_frame(d).unwrap();
        let mut d = frame_draft(10);
        d.period_ms = 500;
        session.append_frame(d).unwrap();

        assert!((session.duration_secs() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_notes_editable_until_close() {
        let mut session = RecordingSession::new();
        session.start(draft()).unwrap();
        session.set_notes(Some("responded well".into())).unwrap();
        assert_eq!(
            session.metadata().unwrap().notes.as_deref(),
            Some("responded well")
        );

        session.append_frame(frame_draft(10)).unwrap();
        session.stop(StopDecision::Save).unwrap();
        assert_eq!(
            session.set_notes(None).unwrap_err(),
            SessionError::SessionClosed
        );
    }
}
