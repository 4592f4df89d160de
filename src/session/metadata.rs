//! Session identity and clinical metadata.
//!
//! Metadata is captured once when a session starts and is immutable
//! thereafter, except for the notes and export preferences, which stay
//! editable until the session closes.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body part being treated. Closed enumeration; free-text locations are not
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentLocation {
    LeftShoulder,
    RightShoulder,
    LowerBack,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl TreatmentLocation {
    pub fn display_name(&self) -> &'static str {
        match self {
            TreatmentLocation::LeftShoulder => "Left Shoulder",
            TreatmentLocation::RightShoulder => "Right Shoulder",
            TreatmentLocation::LowerBack => "Lower Back",
            TreatmentLocation::LeftKnee => "Left Knee",
            TreatmentLocation::RightKnee => "Right Knee",
            TreatmentLocation::LeftAnkle => "Left Ankle",
            TreatmentLocation::RightAnkle => "Right Ankle",
        }
    }
}

/// How the session is being conducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// An operator develops a new protocol while the system records.
    ProtocolDevelopment,
    /// An assistant executes an existing protocol under supervision.
    AssistedExecution,
    /// Autonomous execution replaying a recorded protocol.
    AutonomousExecution,
}

impl SessionMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionMode::ProtocolDevelopment => "Protocol Development",
            SessionMode::AssistedExecution => "Assisted Execution",
            SessionMode::AutonomousExecution => "Autonomous Execution",
        }
    }
}

/// Export behavior attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPreferences {
    /// Write the channel CSV alongside the document when the session saves.
    pub auto_export_csv: bool,
}

impl Default for ExportPreferences {
    fn default() -> Self {
        Self {
            auto_export_csv: true,
        }
    }
}

/// Operator-supplied fields for a new session, before an identity exists.
#[derive(Debug, Clone, Default)]
pub struct MetadataDraft {
    pub subject_id: String,
    pub location: Option<TreatmentLocation>,
    pub operator_id: String,
    pub assistant_id: Option<String>,
    pub mode: Option<SessionMode>,
    pub notes: Option<String>,
    pub export_preferences: ExportPreferences,
}

/// Identity and clinical context of one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Unique identifier, generated when the session starts.
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub subject_id: String,
    pub location: TreatmentLocation,
    pub operator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    pub mode: SessionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub export_preferences: ExportPreferences,
}

/// Generate a session identifier: date-prefixed for sortability on disk,
/// UUID-suffixed so two sessions started the same day can never collide.
pub fn generate_session_id(at: DateTime<Utc>) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("DMR-{}-{}", at.format("%Y%m%d"), &uuid[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_format() {
        let now = Utc::now();
        let id = generate_session_id(now);

        assert!(id.starts_with("DMR-"));
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_session_ids_distinct() {
        let now = Utc::now();
        assert_ne!(generate_session_id(now), generate_session_id(now));
    }

    #[test]
    fn test_location_display_names() {
        assert_eq!(TreatmentLocation::LowerBack.display_name(), "Lower Back");
        assert_eq!(
            TreatmentLocation::LeftShoulder.display_name(),
            "Left Shoulder"
        );
    }

    #[test]
    fn test_export_preferences_default_on() {
        assert!(ExportPreferences::default().auto_export_csv);
    }
}
