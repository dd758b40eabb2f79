//! Alert decisions for a batch of classified readings, plus repeat suppression.
//!
//! The classifier says *whether* a reading is abnormal; this module turns a
//! batch of verdicts into *how* to alert:
//!
//! - no abnormal reading -> [`AlertDecision::None`]
//! - abnormal readings, none critical -> [`AlertDecision::Dismissible`]
//! - at least one critical reading -> [`AlertDecision::Persistent`]
//!
//! [`AlertSuppressor`] keeps the same patient + vital type from re-alerting
//! within a cooldown unless the situation got worse.

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;

use crate::reading::VitalReading;
use crate::severity::{Classification, Severity};
use crate::thresholds::ThresholdSet;
use crate::types::{DbId, Timestamp};
use crate::vital_type::VitalType;

/// How long a dismissible alert stays on screen.
pub const DISMISSIBLE_TIMEOUT_MS: u64 = 9_000;

/// Minimum interval between repeated alerts for the same patient + vital type.
pub const DEFAULT_ALERT_COOLDOWN_SECS: u32 = 300; // 5 minutes

pub const ALERT_TITLE: &str = "異常値検出";

/// Severity level of an emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// At least one reading was abnormal, none critical.
    Warning,
    /// At least one reading was critical.
    Critical,
}

impl AlertLevel {
    pub fn from_severity(severity: Severity) -> Option<Self> {
        match severity {
            Severity::Normal => None,
            Severity::Warning => Some(Self::Warning),
            Severity::Critical => Some(Self::Critical),
        }
    }
}

/// How the presentation layer should surface a batch of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertDecision {
    None,
    /// Auto-dismissed after `timeout_ms`.
    Dismissible { timeout_ms: u64 },
    /// Stays until a nurse dismisses it.
    Persistent,
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedReading {
    pub reading: VitalReading,
    pub classification: Classification,
}

impl ClassifiedReading {
    pub fn severity(&self) -> Severity {
        self.classification.severity
    }
}

/// Per-reading verdicts for a batch plus the counts that drive alerting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalAssessment {
    pub readings: Vec<ClassifiedReading>,
    pub abnormal_count: usize,
    pub critical_count: usize,
}

impl VitalAssessment {
    pub fn abnormal(&self) -> impl Iterator<Item = &ClassifiedReading> {
        self.readings.iter().filter(|r| r.severity().is_abnormal())
    }

    pub fn normal(&self) -> impl Iterator<Item = &ClassifiedReading> {
        self.readings.iter().filter(|r| !r.severity().is_abnormal())
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.readings.iter().map(ClassifiedReading::severity).max()
    }

    pub fn decision(&self) -> AlertDecision {
        AlertDecision::from_assessment(self)
    }
}

/// Classify every reading against the active thresholds for its type.
pub fn assess(readings: &[VitalReading], thresholds: &ThresholdSet) -> VitalAssessment {
    let classified: Vec<ClassifiedReading> = readings
        .iter()
        .map(|reading| ClassifiedReading {
            reading: reading.clone(),
            classification: thresholds.classify(reading),
        })
        .collect();

    let abnormal_count = classified
        .iter()
        .filter(|r| r.severity().is_abnormal())
        .count();
    let critical_count = classified
        .iter()
        .filter(|r| r.severity() == Severity::Critical)
        .count();

    VitalAssessment {
        readings: classified,
        abnormal_count,
        critical_count,
    }
}

impl AlertDecision {
    pub fn from_assessment(assessment: &VitalAssessment) -> Self {
        if assessment.critical_count > 0 {
            Self::Persistent
        } else if assessment.abnormal_count > 0 {
            Self::Dismissible {
                timeout_ms: DISMISSIBLE_TIMEOUT_MS,
            }
        } else {
            Self::None
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// A notification for one patient + vital type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalAlert {
    pub patient_id: DbId,
    pub vital_type: VitalType,
    pub level: AlertLevel,
    pub decision: AlertDecision,
    pub abnormal_count: usize,
    pub critical_count: usize,
    pub title: String,
    pub description: String,
    /// Time of the most recent abnormal reading.
    pub timestamp: Timestamp,
}

/// Build the alert for an assessment of one patient + vital type, or `None`
/// when every reading is normal.
pub fn build_alert(
    patient_id: DbId,
    vital_type: VitalType,
    assessment: &VitalAssessment,
) -> Option<VitalAlert> {
    let level = AlertLevel::from_severity(assessment.highest_severity()?)?;
    let timestamp = assessment.abnormal().map(|r| r.reading.timestamp).max()?;

    Some(VitalAlert {
        patient_id,
        vital_type,
        level,
        decision: assessment.decision(),
        abnormal_count: assessment.abnormal_count,
        critical_count: assessment.critical_count,
        title: ALERT_TITLE.to_string(),
        description: format!(
            "{}件の異常値が検出されました。",
            assessment.abnormal_count
        ),
        timestamp,
    })
}

// ---------------------------------------------------------------------------
// Suppression
// ---------------------------------------------------------------------------

type SuppressionKey = (DbId, VitalType);

#[derive(Debug, Clone, Copy)]
struct LastAlert {
    at: Timestamp,
    level: AlertLevel,
    abnormal_count: usize,
}

/// Tracks the last alert emitted per patient + vital type to suppress
/// repeats within the cooldown window.
///
/// A repeat still goes through when its level is higher or its abnormal
/// count grew since the last emitted alert.
#[derive(Debug)]
pub struct AlertSuppressor {
    cooldown: Duration,
    last_alert: HashMap<SuppressionKey, LastAlert>,
}

impl Default for AlertSuppressor {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSuppressor {
    pub fn new() -> Self {
        Self::with_cooldown(Duration::seconds(i64::from(DEFAULT_ALERT_COOLDOWN_SECS)))
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: HashMap::new(),
        }
    }

    /// Check whether `alert` should be shown and record it if so.
    pub fn should_emit(&mut self, alert: &VitalAlert, now: Timestamp) -> bool {
        let key = (alert.patient_id, alert.vital_type);
        if let Some(last) = self.last_alert.get(&key) {
            let escalated =
                alert.level > last.level || alert.abnormal_count > last.abnormal_count;
            if !escalated && now.signed_duration_since(last.at) < self.cooldown {
                return false;
            }
        }
        self.last_alert.insert(
            key,
            LastAlert {
                at: now,
                level: alert.level,
                abnormal_count: alert.abnormal_count,
            },
        );
        true
    }

    /// Forget the last alert for a patient + vital type, e.g. once readings are normal again.
    pub fn clear(&mut self, patient_id: DbId, vital_type: VitalType) {
        self.last_alert.remove(&(patient_id, vital_type));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap()
    }

    fn temps(values: &[f64]) -> Vec<VitalReading> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                VitalReading::new(7, VitalType::Temperature, v, t0() + Duration::hours(i as i64))
                    .unwrap()
            })
            .collect()
    }

    fn alert_for(values: &[f64]) -> VitalAlert {
        let assessment = assess(&temps(values), &ThresholdSet::defaults());
        build_alert(7, VitalType::Temperature, &assessment).expect("abnormal batch")
    }

    #[test]
    fn all_normal_means_no_alert() {
        let assessment = assess(&temps(&[36.5, 36.8, 37.0]), &ThresholdSet::defaults());
        assert_eq!(assessment.abnormal_count, 0);
        assert_eq!(assessment.decision(), AlertDecision::None);
        assert!(build_alert(7, VitalType::Temperature, &assessment).is_none());
    }

    #[test]
    fn warning_only_is_dismissible() {
        let assessment = assess(&temps(&[36.5, 37.3, 35.2]), &ThresholdSet::defaults());
        assert_eq!(assessment.abnormal_count, 2);
        assert_eq!(assessment.critical_count, 0);
        assert_eq!(assessment.normal().count(), 1);
        assert_eq!(
            assessment.decision(),
            AlertDecision::Dismissible {
                timeout_ms: DISMISSIBLE_TIMEOUT_MS
            }
        );
    }

    #[test]
    fn any_critical_is_persistent() {
        let assessment = assess(&temps(&[36.5, 37.3, 38.7]), &ThresholdSet::defaults());
        assert_eq!(assessment.abnormal_count, 2);
        assert_eq!(assessment.critical_count, 1);
        assert_eq!(assessment.highest_severity(), Some(Severity::Critical));
        assert_eq!(assessment.decision(), AlertDecision::Persistent);
    }

    #[test]
    fn assess_uses_customised_thresholds() {
        let mut set = ThresholdSet::defaults();
        let mut custom = VitalType::Temperature.default_thresholds();
        custom.normal.max = 37.4;
        set.set(VitalType::Temperature, custom).unwrap();

        let assessment = assess(&temps(&[37.3]), &set);
        assert_eq!(assessment.abnormal_count, 0);
    }

    #[test]
    fn alert_carries_counts_and_message() {
        let alert = alert_for(&[36.5, 37.3, 38.7]);
        assert_eq!(alert.level, AlertLevel::Critical);
        assert_eq!(alert.decision, AlertDecision::Persistent);
        assert_eq!(alert.abnormal_count, 2);
        assert_eq!(alert.title, ALERT_TITLE);
        assert_eq!(alert.description, "2件の異常値が検出されました。");
        assert_eq!(alert.timestamp, t0() + Duration::hours(2));
    }

    #[test]
    fn decision_serializes_with_kind_tag() {
        let json = serde_json::to_value(AlertDecision::Dismissible { timeout_ms: 9000 }).unwrap();
        assert_eq!(json["kind"], "dismissible");
        assert_eq!(json["timeout_ms"], 9000);
    }

    #[test]
    fn suppressor_blocks_repeat_within_cooldown() {
        let mut suppressor = AlertSuppressor::new();
        let alert = alert_for(&[37.3]);
        assert!(suppressor.should_emit(&alert, t0()));
        assert!(!suppressor.should_emit(&alert, t0() + Duration::seconds(60)));
    }

    #[test]
    fn suppressor_allows_repeat_after_cooldown() {
        let mut suppressor = AlertSuppressor::with_cooldown(Duration::seconds(120));
        let alert = alert_for(&[37.3]);
        assert!(suppressor.should_emit(&alert, t0()));
        assert!(suppressor.should_emit(&alert, t0() + Duration::seconds(120)));
    }

    #[test]
    fn suppressor_lets_escalation_through() {
        let mut suppressor = AlertSuppressor::new();
        assert!(suppressor.should_emit(&alert_for(&[37.3]), t0()));
        // Level escalates to critical.
        assert!(suppressor.should_emit(&alert_for(&[38.7]), t0() + Duration::seconds(10)));
        // More abnormal readings at the same level.
        assert!(suppressor.should_emit(&alert_for(&[38.7, 39.0]), t0() + Duration::seconds(20)));
        // Fewer abnormal readings is not an escalation.
        assert!(!suppressor.should_emit(&alert_for(&[38.7]), t0() + Duration::seconds(30)));
    }

    #[test]
    fn suppressor_keys_by_patient_and_type() {
        let mut suppressor = AlertSuppressor::new();
        let alert = alert_for(&[37.3]);
        let mut other_patient = alert.clone();
        other_patient.patient_id = 8;
        let mut other_type = alert.clone();
        other_type.vital_type = VitalType::HeartRate;

        assert!(suppressor.should_emit(&alert, t0()));
        assert!(suppressor.should_emit(&other_patient, t0()));
        assert!(suppressor.should_emit(&other_type, t0()));
    }

    #[test]
    fn clear_resets_suppression() {
        let mut suppressor = AlertSuppressor::new();
        let alert = alert_for(&[37.3]);
        assert!(suppressor.should_emit(&alert, t0()));
        suppressor.clear(7, VitalType::Temperature);
        assert!(suppressor.should_emit(&alert, t0() + Duration::seconds(1)));
    }
}
