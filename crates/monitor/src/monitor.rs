//! Assessment runs: fetch readings, classify them per vital type, decide and
//! suppress alerts, and produce a report for display.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use vitalwatch_core::alert::{
    assess, build_alert, AlertLevel, AlertSuppressor, VitalAlert, VitalAssessment,
};
use vitalwatch_core::reading::{ReadingQuery, VitalReading};
use vitalwatch_core::severity::ClassificationRule;
use vitalwatch_core::types::{DbId, Timestamp};
use vitalwatch_core::{ThresholdSet, VitalType};

use crate::error::MonitorError;
use crate::source::ReadingSource;

/// Assessment of one vital type for the report.
#[derive(Debug, Clone, Serialize)]
pub struct VitalGroupReport {
    pub vital_type: VitalType,
    pub label: &'static str,
    pub unit: &'static str,
    pub normal_range: String,
    /// Whether the thresholds used were a session override.
    pub customized: bool,
    pub assessment: VitalAssessment,
    pub alert: Option<VitalAlert>,
    /// An alert was due but withheld by the suppressor.
    pub alert_suppressed: bool,
}

/// Result of one assessment run for a patient.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub patient_id: DbId,
    pub generated_at: Timestamp,
    pub reading_count: usize,
    pub abnormal_count: usize,
    pub critical_count: usize,
    pub groups: Vec<VitalGroupReport>,
}

impl MonitorReport {
    /// Alerts that were actually emitted in this run.
    pub fn emitted_alerts(&self) -> impl Iterator<Item = &VitalAlert> {
        self.groups
            .iter()
            .filter(|g| !g.alert_suppressed)
            .filter_map(|g| g.alert.as_ref())
    }
}

/// Fetch, classify, and alert once.
pub async fn run_once(
    source: &dyn ReadingSource,
    query: &ReadingQuery,
    thresholds: &ThresholdSet,
    suppressor: &mut AlertSuppressor,
    now: Timestamp,
) -> Result<MonitorReport, MonitorError> {
    let readings = source.fetch(query, now).await?;

    let mut by_type: BTreeMap<VitalType, Vec<VitalReading>> = BTreeMap::new();
    for reading in readings.iter() {
        by_type
            .entry(reading.vital_type)
            .or_default()
            .push(reading.clone());
    }

    let mut groups = Vec::with_capacity(by_type.len());
    for (vital_type, group) in by_type {
        groups.push(assess_group(
            query.patient_id,
            vital_type,
            &group,
            thresholds,
            suppressor,
            now,
        ));
    }

    let report = MonitorReport {
        patient_id: query.patient_id,
        generated_at: now,
        reading_count: readings.len(),
        abnormal_count: groups.iter().map(|g| g.assessment.abnormal_count).sum(),
        critical_count: groups.iter().map(|g| g.assessment.critical_count).sum(),
        groups,
    };

    tracing::info!(
        patient_id = report.patient_id,
        readings = report.reading_count,
        abnormal = report.abnormal_count,
        critical = report.critical_count,
        "Assessment complete",
    );

    Ok(report)
}

fn assess_group(
    patient_id: DbId,
    vital_type: VitalType,
    readings: &[VitalReading],
    thresholds: &ThresholdSet,
    suppressor: &mut AlertSuppressor,
    now: Timestamp,
) -> VitalGroupReport {
    let assessment = assess(readings, thresholds);

    for classified in &assessment.readings {
        if classified.classification.rule == ClassificationRule::OutsideNormal {
            tracing::debug!(
                patient_id,
                vital_type = %vital_type,
                value = classified.reading.value,
                "Reading inside warning band but outside normal band",
            );
        }
    }

    let alert = build_alert(patient_id, vital_type, &assessment);
    let alert_suppressed = match &alert {
        Some(alert) => {
            let emit = suppressor.should_emit(alert, now);
            if emit {
                log_alert(alert);
            } else {
                tracing::debug!(patient_id, vital_type = %vital_type, "Alert suppressed");
            }
            !emit
        }
        None => {
            suppressor.clear(patient_id, vital_type);
            false
        }
    };

    VitalGroupReport {
        vital_type,
        label: vital_type.label(),
        unit: vital_type.unit(),
        normal_range: thresholds.get(vital_type).normal_range_text(vital_type.unit()),
        customized: thresholds.is_customized(vital_type),
        assessment,
        alert,
        alert_suppressed,
    }
}

fn log_alert(alert: &VitalAlert) {
    match alert.level {
        AlertLevel::Critical => tracing::error!(
            patient_id = alert.patient_id,
            vital_type = %alert.vital_type,
            abnormal = alert.abnormal_count,
            critical = alert.critical_count,
            "{}",
            alert.description,
        ),
        AlertLevel::Warning => tracing::warn!(
            patient_id = alert.patient_id,
            vital_type = %alert.vital_type,
            abnormal = alert.abnormal_count,
            "{}",
            alert.description,
        ),
    }
}

/// Re-assess on `interval` until `shutdown` resolves, handing every report
/// to `on_report`.
///
/// The suppressor lives across iterations so an unchanged situation alerts
/// once per cooldown. A failed fetch is logged and retried on the next tick.
/// `shutdown` is pinned once for the whole run, so a signal delivered during
/// an assessment stops the loop as soon as that assessment finishes.
pub async fn watch<F, S>(
    source: &dyn ReadingSource,
    query: &ReadingQuery,
    thresholds: &ThresholdSet,
    mut suppressor: AlertSuppressor,
    interval: Duration,
    mut on_report: F,
    shutdown: S,
) where
    F: FnMut(&MonitorReport),
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
            _ = ticker.tick() => {
                match run_once(source, query, thresholds, &mut suppressor, Utc::now()).await {
                    Ok(report) => on_report(&report),
                    Err(e) => tracing::error!(error = %e, "Assessment failed"),
                }
            }
        }
    }
}
