//! Configuration for the tactile recorder.

use crate::scheduler::{DEFAULT_FRAME_PERIOD_MS, MAX_FRAME_PERIOD_MS, MIN_FRAME_PERIOD_MS};
use crate::zones::{ZoneError, ZoneThresholds};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "frame period {0} ms outside the allowed \
         {MIN_FRAME_PERIOD_MS}..={MAX_FRAME_PERIOD_MS} ms range"
    )]
    PeriodOutOfRange(u64),

    #[error(transparent)]
    InvalidThresholds(#[from] ZoneError),
}

/// Persisted operator defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default frame-emission period in milliseconds.
    pub frame_period_ms: u64,

    /// Default zone thresholds in kPa.
    pub zone_thresholds: ZoneThresholds,

    /// Directory for saved session documents.
    pub document_path: PathBuf,

    /// Directory for CSV exports.
    pub export_path: PathBuf,

    /// Write the channel CSV automatically when a session saves.
    pub auto_export_csv: bool,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tactile-recorder");

        Self {
            frame_period_ms: DEFAULT_FRAME_PERIOD_MS,
            zone_thresholds: ZoneThresholds::default(),
            document_path: base.join("sessions"),
            export_path: base.join("exports"),
            auto_export_csv: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tactile-recorder")
            .join("config.json")
    }

    /// Ensure the document and export directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.document_path)?;
        std::fs::create_dir_all(&self.export_path)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FRAME_PERIOD_MS..=MAX_FRAME_PERIOD_MS).contains(&self.frame_period_ms) {
            return Err(ConfigError::PeriodOutOfRange(self.frame_period_ms));
        }
        // A hand-edited file must not smuggle in a bad ordering.
        let t = self.zone_thresholds;
        ZoneThresholds::new(t.min, t.max, t.caution)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.frame_period_ms, DEFAULT_FRAME_PERIOD_MS);
        assert_eq!(config.zone_thresholds, ZoneThresholds::default());
        assert!(config.auto_export_csv);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.frame_period_ms = 250;
        config.auto_export_csv = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.frame_period_ms, 250);
        assert!(!loaded.auto_export_csv);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.frame_period_ms, DEFAULT_FRAME_PERIOD_MS);
    }

    #[test]
    fn test_out_of_range_period_rejected() {
        let mut config = Config::default();
        config.frame_period_ms = 9999;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(matches!(
            config.save_to(&path),
            Err(ConfigError::PeriodOutOfRange(9999))
        ));
    }
}
