//! Reading sources.
//!
//! [`ReadingSource`] is the seam between the monitor and wherever readings
//! live. [`JsonFileSource`] reads the records backend's response shape:
//!
//! ```json
//! { "vital_signs": [ { "id": 1, "patient_id": 3, "timestamp": "2024-05-20T08:00:00",
//!                      "vital_type": "temperature", "value": 36.8, "unit": "°C",
//!                      "is_abnormal": false, "notes": null } ],
//!   "abnormal_count": 0 }
//! ```
//!
//! A bare array of records is accepted too. Records with a vital type this
//! crate does not know are skipped with a warning. `unit`, `notes`,
//! `is_abnormal` and `abnormal_count` are ignored: units come from the vital
//! type and severity is recomputed from the active thresholds.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use vitalwatch_core::reading::{ReadingQuery, VitalReading};
use vitalwatch_core::types::{DbId, Timestamp};
use vitalwatch_core::VitalType;

use crate::error::MonitorError;

/// Supplies a patient's readings for a query, oldest first.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch(
        &self,
        query: &ReadingQuery,
        now: Timestamp,
    ) -> Result<Vec<VitalReading>, MonitorError>;
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One record as served by the records backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedVital {
    #[serde(default)]
    pub id: Option<DbId>,
    pub patient_id: DbId,
    pub timestamp: String,
    pub vital_type: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReadingsPayload {
    Wrapped { vital_signs: Vec<RecordedVital> },
    Bare(Vec<RecordedVital>),
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, MonitorError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| MonitorError::Record(format!("invalid timestamp '{raw}': {e}")))
}

impl RecordedVital {
    /// Convert to a [`VitalReading`]. `Ok(None)` means the vital type is unknown.
    pub fn into_reading(self) -> Result<Option<VitalReading>, MonitorError> {
        let Ok(vital_type) = VitalType::parse(&self.vital_type) else {
            return Ok(None);
        };
        let timestamp = parse_timestamp(&self.timestamp)?;
        let reading = VitalReading::new(self.patient_id, vital_type, self.value, timestamp)?;
        Ok(Some(reading))
    }
}

/// Parse a readings document, skipping records of unknown vital types.
pub fn parse_readings(json: &str) -> Result<Vec<VitalReading>, MonitorError> {
    let records = match serde_json::from_str(json)? {
        ReadingsPayload::Wrapped { vital_signs } => vital_signs,
        ReadingsPayload::Bare(records) => records,
    };

    let mut readings = Vec::with_capacity(records.len());
    for record in records {
        let id = record.id;
        let vital_type = record.vital_type.clone();
        match record.into_reading()? {
            Some(reading) => readings.push(reading),
            None => {
                tracing::warn!(record_id = ?id, vital_type = %vital_type, "Skipping reading of unknown vital type");
            }
        }
    }
    Ok(readings)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Reads a JSON readings document from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReadingSource for JsonFileSource {
    async fn fetch(
        &self,
        query: &ReadingQuery,
        now: Timestamp,
    ) -> Result<Vec<VitalReading>, MonitorError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MonitorError::Io {
                path: self.path.clone(),
                source,
            })?;
        let readings = parse_readings(&json)?;
        tracing::debug!(path = %self.path.display(), total = readings.len(), "Loaded readings file");
        Ok(query.apply(&readings, now))
    }
}

/// Serves a fixed set of readings, e.g. a mock dataset.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    readings: Vec<VitalReading>,
}

impl MemorySource {
    pub fn new(readings: Vec<VitalReading>) -> Self {
        Self { readings }
    }
}

#[async_trait]
impl ReadingSource for MemorySource {
    async fn fetch(
        &self,
        query: &ReadingQuery,
        now: Timestamp,
    ) -> Result<Vec<VitalReading>, MonitorError> {
        Ok(query.apply(&self.readings, now))
    }
}
