//! Vital sign type identifiers, display labels, and measurement units.
//!
//! The label and unit lookups take raw identifiers so that the display layer
//! keeps working when a reading arrives with a type this crate does not know:
//! an unknown label falls back to the identifier itself and an unknown unit
//! to the empty string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub const VITAL_TEMPERATURE: &str = "temperature";
pub const VITAL_BP_SYSTOLIC: &str = "blood_pressure_systolic";
pub const VITAL_BP_DIASTOLIC: &str = "blood_pressure_diastolic";
pub const VITAL_HEART_RATE: &str = "heart_rate";
pub const VITAL_OXYGEN_SATURATION: &str = "oxygen_saturation";
pub const VITAL_RESPIRATION: &str = "respiration";

/// Legacy identifier for [`VitalType::HeartRate`].
pub const ALIAS_PULSE: &str = "pulse";
/// Legacy identifier for [`VitalType::OxygenSaturation`].
pub const ALIAS_SPO2: &str = "spo2";

/// Every canonical identifier, in display order.
pub const VALID_VITAL_TYPES: &[&str] = &[
    VITAL_TEMPERATURE,
    VITAL_BP_SYSTOLIC,
    VITAL_BP_DIASTOLIC,
    VITAL_HEART_RATE,
    VITAL_OXYGEN_SATURATION,
    VITAL_RESPIRATION,
];

/// A physiological measurement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalType {
    Temperature,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    #[serde(alias = "pulse")]
    HeartRate,
    #[serde(alias = "spo2")]
    OxygenSaturation,
    Respiration,
}

impl VitalType {
    pub const ALL: [VitalType; 6] = [
        VitalType::Temperature,
        VitalType::BloodPressureSystolic,
        VitalType::BloodPressureDiastolic,
        VitalType::HeartRate,
        VitalType::OxygenSaturation,
        VitalType::Respiration,
    ];

    /// Parse a canonical identifier or one of its legacy aliases.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            VITAL_TEMPERATURE => Ok(Self::Temperature),
            VITAL_BP_SYSTOLIC => Ok(Self::BloodPressureSystolic),
            VITAL_BP_DIASTOLIC => Ok(Self::BloodPressureDiastolic),
            VITAL_HEART_RATE | ALIAS_PULSE => Ok(Self::HeartRate),
            VITAL_OXYGEN_SATURATION | ALIAS_SPO2 => Ok(Self::OxygenSaturation),
            VITAL_RESPIRATION => Ok(Self::Respiration),
            _ => Err(CoreError::UnknownVitalType(s.to_string())),
        }
    }

    /// Canonical identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => VITAL_TEMPERATURE,
            Self::BloodPressureSystolic => VITAL_BP_SYSTOLIC,
            Self::BloodPressureDiastolic => VITAL_BP_DIASTOLIC,
            Self::HeartRate => VITAL_HEART_RATE,
            Self::OxygenSaturation => VITAL_OXYGEN_SATURATION,
            Self::Respiration => VITAL_RESPIRATION,
        }
    }

    /// Display label shown next to charts and badges.
    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "体温",
            Self::BloodPressureSystolic => "収縮期血圧",
            Self::BloodPressureDiastolic => "拡張期血圧",
            Self::HeartRate => "心拍数",
            Self::OxygenSaturation => "酸素飽和度",
            Self::Respiration => "呼吸数",
        }
    }

    /// Measurement unit.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::BloodPressureSystolic | Self::BloodPressureDiastolic => "mmHg",
            Self::HeartRate | Self::Respiration => "bpm",
            Self::OxygenSaturation => "%",
        }
    }
}

impl fmt::Display for VitalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Display lookups
// ---------------------------------------------------------------------------

/// Display label for a raw identifier; unknown identifiers pass through unchanged.
pub fn label(vital_type: &str) -> &str {
    match VitalType::parse(vital_type) {
        Ok(vt) => vt.label(),
        Err(_) => vital_type,
    }
}

/// Measurement unit for a raw identifier; unknown identifiers map to `""`.
pub fn unit(vital_type: &str) -> &'static str {
    VitalType::parse(vital_type).map(VitalType::unit).unwrap_or("")
}

/// Render a value with its unit, e.g. `38.7°C`.
pub fn format_value(vital_type: &str, value: f64) -> String {
    format!("{value}{}", unit(vital_type))
}
