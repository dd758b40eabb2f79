//! Tiered threshold bands, built-in defaults, and the per-session threshold set.
//!
//! Pure logic. A [`ThresholdSet`] starts from the immutable defaults; callers
//! that let a nurse customise thresholds clone it and apply overrides. Every
//! override is checked with [`ThresholdConfig::validate`] before it is
//! accepted, so malformed bands are rejected at load time rather than
//! producing surprising classifications later.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reading::VitalReading;
use crate::severity::{classify_detailed, Classification};
use crate::vital_type::VitalType;

/// One inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub min: f64,
    pub max: f64,
}

impl ThresholdBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies inside the band, bounds included.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The three severity bands for one vital type.
///
/// Intended nesting:
/// `critical.min <= warning.min <= normal.min <= normal.max <= warning.max <= critical.max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub normal: ThresholdBand,
    pub warning: ThresholdBand,
    pub critical: ThresholdBand,
}

impl ThresholdConfig {
    /// Check that every bound is finite, every band is ordered, and the
    /// bands nest from critical (widest) to normal (narrowest).
    pub fn validate(&self, vital_type: VitalType) -> Result<(), CoreError> {
        let malformed = |reason: String| CoreError::MalformedThresholds {
            vital_type: vital_type.as_str().to_string(),
            reason,
        };

        for (name, band) in self.named_bands() {
            if !band.min.is_finite() || !band.max.is_finite() {
                return Err(malformed(format!("{name} band has a non-finite bound")));
            }
            if band.min > band.max {
                return Err(malformed(format!(
                    "{name} band min {} exceeds max {}",
                    band.min, band.max
                )));
            }
        }

        if self.critical.min > self.warning.min || self.warning.max > self.critical.max {
            return Err(malformed(
                "warning band must lie within the critical band".to_string(),
            ));
        }
        if self.warning.min > self.normal.min || self.normal.max > self.warning.max {
            return Err(malformed(
                "normal band must lie within the warning band".to_string(),
            ));
        }

        Ok(())
    }

    /// Caption for the normal range, e.g. `正常範囲: 36°C - 37.2°C`.
    pub fn normal_range_text(&self, unit: &str) -> String {
        format!(
            "正常範囲: {}{unit} - {}{unit}",
            self.normal.min, self.normal.max
        )
    }

    fn named_bands(&self) -> [(&'static str, &ThresholdBand); 3] {
        [
            ("normal", &self.normal),
            ("warning", &self.warning),
            ("critical", &self.critical),
        ]
    }
}

// ---------------------------------------------------------------------------
// Built-in defaults
// ---------------------------------------------------------------------------

const fn tiers(normal: (f64, f64), warning: (f64, f64), critical: (f64, f64)) -> ThresholdConfig {
    ThresholdConfig {
        normal: ThresholdBand::new(normal.0, normal.1),
        warning: ThresholdBand::new(warning.0, warning.1),
        critical: ThresholdBand::new(critical.0, critical.1),
    }
}

pub const TEMPERATURE_THRESHOLDS: ThresholdConfig =
    tiers((36.0, 37.2), (35.5, 37.5), (35.0, 38.5));
pub const BP_SYSTOLIC_THRESHOLDS: ThresholdConfig =
    tiers((100.0, 130.0), (90.0, 140.0), (80.0, 180.0));
pub const BP_DIASTOLIC_THRESHOLDS: ThresholdConfig =
    tiers((60.0, 85.0), (55.0, 90.0), (50.0, 110.0));
pub const HEART_RATE_THRESHOLDS: ThresholdConfig =
    tiers((60.0, 90.0), (50.0, 100.0), (40.0, 120.0));
pub const OXYGEN_SATURATION_THRESHOLDS: ThresholdConfig =
    tiers((95.0, 100.0), (92.0, 100.0), (90.0, 100.0));
/// Normal band carried over from the legacy single-range table (12-20 bpm).
pub const RESPIRATION_THRESHOLDS: ThresholdConfig =
    tiers((12.0, 20.0), (10.0, 24.0), (8.0, 30.0));

impl VitalType {
    /// Built-in threshold bands for this vital type.
    pub fn default_thresholds(self) -> ThresholdConfig {
        match self {
            Self::Temperature => TEMPERATURE_THRESHOLDS,
            Self::BloodPressureSystolic => BP_SYSTOLIC_THRESHOLDS,
            Self::BloodPressureDiastolic => BP_DIASTOLIC_THRESHOLDS,
            Self::HeartRate => HEART_RATE_THRESHOLDS,
            Self::OxygenSaturation => OXYGEN_SATURATION_THRESHOLDS,
            Self::Respiration => RESPIRATION_THRESHOLDS,
        }
    }
}

/// Built-in threshold bands for a raw vital type identifier.
///
/// Returns [`CoreError::UnknownVitalType`] for identifiers with no defaults.
pub fn default_thresholds(vital_type: &str) -> Result<ThresholdConfig, CoreError> {
    VitalType::parse(vital_type).map(VitalType::default_thresholds)
}

// ---------------------------------------------------------------------------
// Threshold set
// ---------------------------------------------------------------------------

/// The active threshold configuration for every vital type.
///
/// Holds only the overrides; types without one resolve to the built-in
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdSet {
    overrides: HashMap<VitalType, ThresholdConfig>,
}

impl ThresholdSet {
    /// A set with no overrides.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Layer validated overrides, keyed by any accepted identifier, over the defaults.
    ///
    /// Two keys naming the same vital type (e.g. `pulse` and `heart_rate`)
    /// are rejected.
    pub fn from_overrides(overrides: HashMap<String, ThresholdConfig>) -> Result<Self, CoreError> {
        let mut set = Self::defaults();
        for (key, config) in overrides {
            let vital_type = VitalType::parse(&key)?;
            if set.is_customized(vital_type) {
                return Err(CoreError::MalformedThresholds {
                    vital_type: vital_type.as_str().to_string(),
                    reason: format!("overridden more than once (last key '{key}')"),
                });
            }
            set.set(vital_type, config)?;
        }
        Ok(set)
    }

    /// Parse a JSON object of overrides, e.g.
    /// `{"temperature": {"normal": {"min": 36.0, "max": 37.0}, ...}}`.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let overrides: HashMap<String, ThresholdConfig> = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid threshold overrides: {e}")))?;
        Self::from_overrides(overrides)
    }

    /// Active configuration for `vital_type`.
    pub fn get(&self, vital_type: VitalType) -> ThresholdConfig {
        self.overrides
            .get(&vital_type)
            .copied()
            .unwrap_or_else(|| vital_type.default_thresholds())
    }

    /// Replace the configuration for `vital_type` after validating it.
    ///
    /// The set is left untouched when validation fails.
    pub fn set(&mut self, vital_type: VitalType, config: ThresholdConfig) -> Result<(), CoreError> {
        config.validate(vital_type)?;
        self.overrides.insert(vital_type, config);
        Ok(())
    }

    /// Drop any override for `vital_type`, restoring the default.
    pub fn reset(&mut self, vital_type: VitalType) {
        self.overrides.remove(&vital_type);
    }

    pub fn is_customized(&self, vital_type: VitalType) -> bool {
        self.overrides.contains_key(&vital_type)
    }

    /// Classify a reading against the active configuration for its type.
    pub fn classify(&self, reading: &VitalReading) -> Classification {
        classify_detailed(reading.value, &self.get(reading.vital_type))
    }

    /// Vital types carrying an override, in canonical order.
    pub fn customized_types(&self) -> Vec<VitalType> {
        let mut types: Vec<VitalType> = self.overrides.keys().copied().collect();
        types.sort();
        types
    }
}
