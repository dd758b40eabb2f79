//! Timestamped vital readings and the patient/type/time-window query used to
//! select them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::vital_type::VitalType;

/// Trailing window applied when a query does not specify one.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// One measurement for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub patient_id: DbId,
    pub vital_type: VitalType,
    pub value: f64,
    pub timestamp: Timestamp,
}

impl VitalReading {
    /// Build a reading, rejecting non-finite values.
    pub fn new(
        patient_id: DbId,
        vital_type: VitalType,
        value: f64,
        timestamp: Timestamp,
    ) -> Result<Self, CoreError> {
        let reading = Self {
            patient_id,
            vital_type,
            value,
            timestamp,
        };
        reading.validate()?;
        Ok(reading)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.value.is_finite() {
            return Err(CoreError::Validation(format!(
                "{} reading for patient {} must be a finite number, got {}",
                self.vital_type, self.patient_id, self.value
            )));
        }
        Ok(())
    }
}

/// Selects a patient's readings, optionally narrowed to one vital type and a
/// trailing window of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingQuery {
    pub patient_id: DbId,
    pub vital_type: Option<VitalType>,
    /// `None` or `Some(0)` disables the window.
    pub days: Option<u32>,
}

impl ReadingQuery {
    /// All vital types for `patient_id` over the default window.
    pub fn new(patient_id: DbId) -> Self {
        Self {
            patient_id,
            vital_type: None,
            days: Some(DEFAULT_WINDOW_DAYS),
        }
    }

    pub fn with_vital_type(mut self, vital_type: VitalType) -> Self {
        self.vital_type = Some(vital_type);
        self
    }

    pub fn with_days(mut self, days: Option<u32>) -> Self {
        self.days = days;
        self
    }

    pub fn matches(&self, reading: &VitalReading, now: Timestamp) -> bool {
        if reading.patient_id != self.patient_id {
            return false;
        }
        if self.vital_type.is_some_and(|vt| vt != reading.vital_type) {
            return false;
        }
        match self.window_start(now) {
            Some(start) => reading.timestamp >= start,
            None => true,
        }
    }

    /// Earliest timestamp inside the window. `None` when there is no window
    /// or it reaches past the representable date range.
    pub fn window_start(&self, now: Timestamp) -> Option<Timestamp> {
        let days = self.days.filter(|&d| d > 0)?;
        chrono::Duration::try_days(i64::from(days)).and_then(|span| now.checked_sub_signed(span))
    }

    /// Matching readings, oldest first.
    pub fn apply(&self, readings: &[VitalReading], now: Timestamp) -> Vec<VitalReading> {
        let mut selected: Vec<VitalReading> = readings
            .iter()
            .filter(|r| self.matches(r, now))
            .cloned()
            .collect();
        selected.sort_by_key(|r| r.timestamp);
        selected
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn reading(patient_id: DbId, vt: VitalType, value: f64, days_ago: i64) -> VitalReading {
        VitalReading::new(patient_id, vt, value, now() - Duration::days(days_ago)).unwrap()
    }

    #[test]
    fn rejects_non_finite_values() {
        assert_matches!(
            VitalReading::new(1, VitalType::Temperature, f64::NAN, now()),
            Err(CoreError::Validation(_))
        );
        assert!(VitalReading::new(1, VitalType::Temperature, f64::INFINITY, now()).is_err());
    }

    #[test]
    fn default_query_uses_seven_day_window() {
        let q = ReadingQuery::new(3);
        assert_eq!(q.days, Some(DEFAULT_WINDOW_DAYS));
        assert_eq!(q.vital_type, None);
    }

    #[test]
    fn apply_filters_patient_type_and_window() {
        let readings = vec![
            reading(1, VitalType::Temperature, 36.8, 1),
            reading(2, VitalType::Temperature, 36.6, 1),
            reading(1, VitalType::HeartRate, 80.0, 1),
            reading(1, VitalType::Temperature, 37.0, 10),
        ];
        let q = ReadingQuery::new(1).with_vital_type(VitalType::Temperature);
        let selected = q.apply(&readings, now());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, 36.8);
    }

    #[test]
    fn zero_or_missing_days_disables_window() {
        let readings = vec![reading(1, VitalType::Temperature, 37.0, 400)];
        assert_eq!(ReadingQuery::new(1).with_days(None).apply(&readings, now()).len(), 1);
        assert_eq!(ReadingQuery::new(1).with_days(Some(0)).apply(&readings, now()).len(), 1);
        assert!(ReadingQuery::new(1).apply(&readings, now()).is_empty());
    }

    #[test]
    fn window_past_date_range_means_everything() {
        let readings = vec![reading(1, VitalType::Temperature, 37.0, 4000)];
        let q = ReadingQuery::new(1).with_days(Some(100_000_000));
        assert_eq!(q.window_start(now()), None);
        assert_eq!(q.apply(&readings, now()).len(), 1);

        let q = ReadingQuery::new(1).with_days(Some(u32::MAX));
        assert_eq!(q.apply(&readings, now()).len(), 1);
    }

    #[test]
    fn window_start_is_days_before_now() {
        let q = ReadingQuery::new(1).with_days(Some(3));
        assert_eq!(q.window_start(now()), Some(now() - Duration::days(3)));
        assert_eq!(ReadingQuery::new(1).with_days(Some(0)).window_start(now()), None);
    }

    #[test]
    fn apply_sorts_oldest_first() {
        let readings = vec![
            reading(1, VitalType::HeartRate, 70.0, 0),
            reading(1, VitalType::HeartRate, 90.0, 3),
            reading(1, VitalType::HeartRate, 80.0, 1),
        ];
        let values: Vec<f64> = ReadingQuery::new(1)
            .apply(&readings, now())
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![90.0, 80.0, 70.0]);
    }
}
