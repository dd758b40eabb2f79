//! Severity classification of a single reading against tiered thresholds.
//!
//! Pure logic, no allocation. The decision order is fixed because bands
//! supplied by callers may overlap or leave gaps:
//!
//! 1. outside the critical band -> `Critical`
//! 2. outside the warning band -> `Warning`
//! 3. inside the normal band (inclusive) -> `Normal`
//! 4. anything else -> `Warning`
//!
//! Step 4 covers values inside the warning envelope but outside the normal
//! band. It is reported as [`ClassificationRule::OutsideNormal`] so callers
//! can tell it apart from an explicit warning-band breach.

use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdConfig;

/// Severity tier of a reading. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// `Warning` and `Critical` readings are abnormal.
    pub fn is_abnormal(self) -> bool {
        self != Self::Normal
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which step of the decision order produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    OutsideCritical,
    OutsideWarning,
    WithinNormal,
    /// Inside the warning band but outside the normal band.
    OutsideNormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub severity: Severity,
    pub rule: ClassificationRule,
}

/// Classify `value` and report the rule that decided it.
///
/// `value` is expected to be finite.
pub fn classify_detailed(value: f64, thresholds: &ThresholdConfig) -> Classification {
    let (severity, rule) = if value < thresholds.critical.min || value > thresholds.critical.max {
        (Severity::Critical, ClassificationRule::OutsideCritical)
    } else if value < thresholds.warning.min || value > thresholds.warning.max {
        (Severity::Warning, ClassificationRule::OutsideWarning)
    } else if thresholds.normal.contains(value) {
        (Severity::Normal, ClassificationRule::WithinNormal)
    } else {
        (Severity::Warning, ClassificationRule::OutsideNormal)
    };
    Classification { severity, rule }
}

/// Classify `value` against `thresholds`.
pub fn classify(value: f64, thresholds: &ThresholdConfig) -> Severity {
    classify_detailed(value, thresholds).severity
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
