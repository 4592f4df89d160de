//! Pressure-zone classification.
//!
//! Every display and export path classifies pressures against the operator's
//! current thresholds. Classification is a view over a value, never stored
//! per frame, so retuning the thresholds re-colors history instantly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Readings below this value are treated as sensor noise (no contact).
pub const NOISE_FLOOR_KPA: f64 = 1.0;

/// One of five ordered pressure bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureZone {
    /// Below the noise floor; the sensor is not touching anything.
    NoContact,
    /// Contact, but below the therapeutic minimum.
    BelowRange,
    /// Within the therapeutic range.
    InRange,
    /// Above the therapeutic maximum but still tolerable.
    AboveRange,
    /// Above the caution threshold.
    Danger,
}

impl PressureZone {
    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            PressureZone::NoContact => "No Contact",
            PressureZone::BelowRange => "Below Range",
            PressureZone::InRange => "In Range",
            PressureZone::AboveRange => "Above Range",
            PressureZone::Danger => "Danger",
        }
    }
}

/// Errors from zone configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ZoneError {
    #[error(
        "invalid thresholds: require 0 < min < max < caution, \
         got min={min} max={max} caution={caution}"
    )]
    InvalidThresholds { min: f64, max: f64, caution: f64 },
}

/// Operator-configured zone boundaries in kPa.
///
/// Invariant: `0 < min < max < caution`. Construction and mutation both
/// enforce it; a rejected update leaves the previous thresholds in effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    pub min: f64,
    pub max: f64,
    pub caution: f64,
}

impl Default for ZoneThresholds {
    /// Standard PT values (20/45/60 kPa).
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 45.0,
            caution: 60.0,
        }
    }
}

impl ZoneThresholds {
    /// Create thresholds, enforcing the ordering invariant.
    pub fn new(min: f64, max: f64, caution: f64) -> Result<Self, ZoneError> {
        if min > 0.0 && min < max && max < caution {
            Ok(Self { min, max, caution })
        } else {
            Err(ZoneError::InvalidThresholds { min, max, caution })
        }
    }

    /// Replace the thresholds. On error nothing is mutated.
    pub fn set(&mut self, min: f64, max: f64, caution: f64) -> Result<(), ZoneError> {
        *self = Self::new(min, max, caution)?;
        Ok(())
    }

    /// Classify one pressure value against these thresholds.
    pub fn classify(&self, value: f64) -> PressureZone {
        if value < NOISE_FLOOR_KPA {
            PressureZone::NoContact
        } else if value < self.min {
            PressureZone::BelowRange
        } else if value <= self.max {
            PressureZone::InRange
        } else if value <= self.caution {
            PressureZone::AboveRange
        } else {
            PressureZone::Danger
        }
    }

    /// Soft tissue mobilization (light) preset.
    pub fn preset_soft_tissue() -> Self {
        Self {
            min: 15.0,
            max: 35.0,
            caution: 50.0,
        }
    }

    /// Joint mobilization grade IV (strong) preset.
    pub fn preset_joint_mobilization() -> Self {
        Self {
            min: 30.0,
            max: 55.0,
            caution: 75.0,
        }
    }

    /// Lymphatic drainage (very light) preset.
    pub fn preset_lymphatic() -> Self {
        Self {
            min: 5.0,
            max: 15.0,
            caution: 25.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_all_bands() {
        let zones = ZoneThresholds::new(20.0, 45.0, 60.0).unwrap();

        let values = [0.0, 10.0, 20.0, 45.0, 46.0, 60.0, 61.0];
        let expected = [
            PressureZone::NoContact,
            PressureZone::BelowRange,
            PressureZone::InRange,
            PressureZone::InRange,
            PressureZone::AboveRange,
            PressureZone::AboveRange,
            PressureZone::Danger,
        ];

        for (value, want) in values.iter().zip(expected.iter()) {
            assert_eq!(zones.classify(*value), *want, "value {value}");
        }
    }

    #[test]
    fn test_invalid_ordering_rejected() {
        assert!(ZoneThresholds::new(45.0, 20.0, 60.0).is_err());
        assert!(ZoneThresholds::new(20.0, 60.0, 45.0).is_err());
        assert!(ZoneThresholds::new(20.0, 20.0, 60.0).is_err());
        assert!(ZoneThresholds::new(0.0, 45.0, 60.0).is_err());
        assert!(ZoneThresholds::new(-5.0, 45.0, 60.0).is_err());
    }

    #[test]
    fn test_rejected_update_keeps_previous() {
        let mut zones = ZoneThresholds::default();
        let before = zones;

        let err = zones.set(50.0, 40.0, 60.0).unwrap_err();
        assert!(matches!(err, ZoneError::InvalidThresholds { .. }));
        assert_eq!(zones, before);
        assert_eq!(zones.classify(30.0), PressureZone::InRange);
    }

    #[test]
    fn test_presets_satisfy_invariant() {
        for preset in [
            ZoneThresholds::default(),
            ZoneThresholds::preset_soft_tissue(),
            ZoneThresholds::preset_joint_mobilization(),
            ZoneThresholds::preset_lymphatic(),
        ] {
            assert!(ZoneThresholds::new(preset.min, preset.max, preset.caution).is_ok());
        }
    }

    #[test]
    fn test_zone_ordering() {
        assert!(PressureZone::NoContact < PressureZone::BelowRange);
        assert!(PressureZone::InRange < PressureZone::Danger);
    }
}
