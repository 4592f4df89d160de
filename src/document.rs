//! Session document persistence and export.
//!
//! A saved session becomes a self-describing JSON document: provenance,
//! metadata, the zone thresholds in force when it was saved, every frame,
//! and a summary. Loading reconstructs a closed, saved session that can be
//! reviewed and exported but never extended.
//!
//! Exports classify against the thresholds supplied at export time, not the
//! ones stored in the document, so a retuned operator setup re-colors
//! history.

use crate::core::frame::Frame;
use crate::session::metadata::SessionMetadata;
use crate::session::recording::RecordingSession;
use crate::zones::{ZoneError, ZoneThresholds};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// On-disk document format version.
pub const FORMAT_VERSION: &str = "1.0";

const CREATED_BY: &str = concat!("tactile-recorder v", env!("CARGO_PKG_VERSION"));
const DEVICE: &str = "TactileSense 13x5 pressure array";

/// Errors from document persistence and export.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The session has no metadata; nothing to persist.
    #[error("session has no metadata to persist")]
    NoSession,

    #[error("unsupported document format version {0:?}")]
    UnsupportedVersion(String),

    /// Disk-level failure. The in-memory session is untouched.
    #[error("document persistence failed: {0}")]
    PersistenceFailure(#[from] io::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The stored zone thresholds violate the ordering invariant.
    #[error(transparent)]
    InvalidThresholds(#[from] ZoneError),
}

/// Summary block written alongside the frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_frames: u64,
    /// Recorded span: the sum of each frame's own period, so a mid-session
    /// period change is reflected accurately.
    pub duration_seconds: f64,
    /// Whether the session was closed and saved by the operator, as opposed
    /// to a snapshot of one still in progress.
    pub complete: bool,
}

/// The persisted form of one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub format_version: String,
    pub created_by: String,
    pub device: String,
    pub session: SessionMetadata,
    /// Thresholds in force when the document was saved, kept for context;
    /// exports always classify against the caller's current thresholds.
    pub zone_thresholds: ZoneThresholds,
    pub frames: Vec<Frame>,
    pub summary: SessionSummary,
}

impl SessionDocument {
    /// Build a document from a session and the thresholds in force.
    pub fn from_session(
        session: &RecordingSession,
        zone_thresholds: ZoneThresholds,
    ) -> Result<Self, DocumentError> {
        let metadata = session.metadata().ok_or(DocumentError::NoSession)?;
        Ok(Self {
            format_version: FORMAT_VERSION.to_string(),
            created_by: CREATED_BY.to_string(),
            device: DEVICE.to_string(),
            session: metadata.clone(),
            zone_thresholds,
            frames: session.frames().to_vec(),
            summary: SessionSummary {
                total_frames: session.frame_count() as u64,
                duration_seconds: session.duration_secs(),
                complete: session.is_saved(),
            },
        })
    }

    /// Reconstruct the session this document was saved from. The result is
    /// closed and saved: reviewable and exportable, never appendable.
    pub fn into_session(self) -> RecordingSession {
        RecordingSession::from_saved_parts(self.session, self.frames)
    }

    /// Write the document as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(
            path = %path.display(),
            frames = self.summary.total_frames,
            "session document saved"
        );
        Ok(())
    }

    /// Read a document back, rejecting unknown format versions and
    /// documents whose stored thresholds violate the ordering invariant.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let json = fs::read_to_string(path)?;
        let document: SessionDocument = serde_json::from_str(&json)?;
        if document.format_version != FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion(
                document.format_version,
            ));
        }
        let t = document.zone_thresholds;
        ZoneThresholds::new(t.min, t.max, t.caution)?;
        Ok(document)
    }

    /// Export every frame as one CSV row of raw channel values.
    pub fn export_channel_csv(&self, path: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);

        write!(out, "Frame,Timestamp,Pattern,Roll,Pitch,Yaw")?;
        for channel in 0..crate::source::types::CHANNEL_COUNT {
            write!(out, ",Channel_{channel}")?;
        }
        writeln!(out)?;

        for frame in &self.frames {
            write!(
                out,
                "{},{},{},{:.2},{:.2},{:.2}",
                frame.index,
                frame.timestamp.to_rfc3339(),
                csv_field(frame.pattern_tag.as_deref().unwrap_or("")),
                frame.orientation.roll,
                frame.orientation.pitch,
                frame.orientation.yaw,
            )?;
            for &value in &frame.channels {
                write!(out, ",{value}")?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        info!(path = %path.display(), "channel CSV exported");
        Ok(())
    }

    /// Export the clinical report: a metadata header block, then one row of
    /// per-frame statistics classified against the given thresholds.
    pub fn export_report_csv(
        &self,
        path: &Path,
        thresholds: &ZoneThresholds,
    ) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);

        writeln!(out, "Session Report")?;
        writeln!(out, "Generated,{}", Utc::now().to_rfc3339())?;
        writeln!(out, "Session ID,{}", csv_field(&self.session.session_id))?;
        writeln!(out, "Subject,{}", csv_field(&self.session.subject_id))?;
        writeln!(out, "Location,{}", self.session.location.display_name())?;
        writeln!(out, "Operator,{}", csv_field(&self.session.operator_id))?;
        if let Some(assistant) = &self.session.assistant_id {
            writeln!(out, "Assistant,{}", csv_field(assistant))?;
        }
        writeln!(out, "Mode,{}", self.session.mode.display_name())?;
        if let Some(notes) = &self.session.notes {
            writeln!(out, "Notes,{}", csv_field(notes))?;
        }
        writeln!(
            out,
            "Zones,min={} max={} caution={}",
            thresholds.min, thresholds.max, thresholds.caution
        )?;
        writeln!(out, "Total Frames,{}", self.summary.total_frames)?;
        writeln!(out, "Duration (s),{:.2}", self.summary.duration_seconds)?;
        writeln!(out)?;

        writeln!(
            out,
            "Frame,Timestamp,Pattern,Peak_kPa,Avg_kPa,Zone,Active_Channels"
        )?;
        for frame in &self.frames {
            let peak = frame.peak();
            let zone = thresholds.classify(f64::from(peak));
            writeln!(
                out,
                "{},{},{},{},{:.2},{},{}",
                frame.index,
                frame.timestamp.to_rfc3339(),
                csv_field(frame.pattern_tag.as_deref().unwrap_or("")),
                peak,
                frame.active_mean(),
                zone.label(),
                frame.active_channel_count(),
            )?;
        }
        out.flush()?;
        info!(path = %path.display(), "report CSV exported");
        Ok(())
    }
}

/// Quote a CSV field only when it needs it.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::FrameDraft;
    use crate::session::metadata::{
        ExportPreferences, MetadataDraft, SessionMode, TreatmentLocation,
    };
    use crate::session::recording::{SessionError, SessionState, StopDecision};
    use crate::source::types::Orientation;

    fn saved_session() -> RecordingSession {
        let mut session = RecordingSession::new();
        session
            .start(MetadataDraft {
                subject_id: "PT-1042".into(),
                location: Some(TreatmentLocation::LowerBack),
                operator_id: "OP-7".into(),
                assistant_id: Some("PTA-3".into()),
                mode: Some(SessionMode::AssistedExecution),
                notes: Some("gentle start, ramped up".into()),
                export_preferences: ExportPreferences::default(),
            })
            .unwrap();
        for (level, period_ms) in [(30u16, 100u32), (50, 100), (70, 500)] {
            session
                .append_frame(FrameDraft {
                    timestamp: Utc::now(),
                    channels: vec![level; 65],
                    orientation: Orientation::new(1.0, 2.0, 3.0),
                    pattern_tag: Some("circular".into()),
                    period_ms,
                    samples_averaged: 2,
                })
                .unwrap();
        }
        session.stop(StopDecision::Save).unwrap();
        session
    }

    #[test]
    fn test_document_round_trip() {
        let session = saved_session();
        let document =
            SessionDocument::from_session(&session, ZoneThresholds::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        document.save(&path).unwrap();

        let loaded = SessionDocument::load(&path).unwrap();
        assert_eq!(loaded, document);
        assert_eq!(loaded.format_version, FORMAT_VERSION);
        assert_eq!(loaded.summary.total_frames, 3);
        // 0.1 + 0.1 + 0.5, not 3 * 0.05
        assert!((loaded.summary.duration_seconds - 0.7).abs() < 1e-9);
        assert!(loaded.summary.complete);
    }

    #[test]
    fn test_loaded_session_is_read_only() {
        let document =
            SessionDocument::from_session(&saved_session(), ZoneThresholds::default()).unwrap();
        let mut reloaded = document.into_session();

        assert_eq!(reloaded.frame_count(), 3);
        assert!(matches!(reloaded.state(), SessionState::Closed(_)));
        assert_eq!(reloaded.resume().unwrap_err(), SessionError::SessionClosed);
    }

    #[test]
    fn test_from_session_requires_metadata() {
        let session = RecordingSession::new();
        let err = SessionDocument::from_session(&session, ZoneThresholds::default()).unwrap_err();
        assert!(matches!(err, DocumentError::NoSession));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let session = saved_session();
        let mut document =
            SessionDocument::from_session(&session, ZoneThresholds::default()).unwrap();
        document.format_version = "9.9".into();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        document.save(&path).unwrap();

        match SessionDocument::load(&path).unwrap_err() {
            DocumentError::UnsupportedVersion(v) => assert_eq!(v, "9.9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_stored_thresholds_rejected() {
        let session = saved_session();
        let mut document =
            SessionDocument::from_session(&session, ZoneThresholds::default()).unwrap();
        document.zone_thresholds = ZoneThresholds {
            min: 50.0,
            max: 20.0,
            caution: 60.0,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad-zones.json");
        document.save(&path).unwrap();

        assert!(matches!(
            SessionDocument::load(&path).unwrap_err(),
            DocumentError::InvalidThresholds(_)
        ));
    }

    #[test]
    fn test_channel_csv_shape() {
        let document =
            SessionDocument::from_session(&saved_session(), ZoneThresholds::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        document.export_channel_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Frame,Timestamp,Pattern,Roll,Pitch,Yaw,Channel_0"));
        assert!(lines[0].ends_with("Channel_64"));
        // header: 6 fixed columns + 65 channels
        assert_eq!(lines[0].split(',').count(), 71);
        assert_eq!(lines[1].split(',').count(), 71);
        assert!(lines[1].starts_with("0,"));
        assert!(lines[1].contains(",circular,"));
    }

    #[test]
    fn test_report_classifies_against_current_thresholds() {
        let document =
            SessionDocument::from_session(&saved_session(), ZoneThresholds::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        // Export against non-default thresholds: frames peaked at 30/50/70.
        let current = ZoneThresholds::new(40.0, 60.0, 80.0).unwrap();
        document.export_report_csv(&path, &current).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Session ID,"));
        assert!(text.contains("Subject,PT-1042"));
        assert!(text.contains("Assistant,PTA-3"));
        assert!(text.contains("Zones,min=40 max=60 caution=80"));

        let rows: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.starts_with("Frame,"))
            .skip(1)
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains(",Below Range,"));
        assert!(rows[1].contains(",In Range,"));
        assert!(rows[2].contains(",Above Range,"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"ow\""), "\"say \"\"ow\"\"\"");
    }
}
