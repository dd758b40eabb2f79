//! Monitor configuration from environment variables.
//!
//! | Variable                     | Required | Default    | Description                                 |
//! |------------------------------|----------|------------|---------------------------------------------|
//! | `VITALS_READINGS_PATH`       | yes      | --         | JSON readings file                          |
//! | `VITALS_PATIENT_ID`          | yes      | --         | Integer ID of the patient to assess         |
//! | `VITALS_TYPE`                | no       | all types  | Restrict to one vital type (aliases accepted) |
//! | `VITALS_DAYS`                | no       | `7`        | Trailing window in days, `0` for everything |
//! | `VITALS_THRESHOLDS_PATH`     | no       | built-ins  | JSON threshold overrides                    |
//! | `VITALS_ALERT_COOLDOWN_SECS` | no       | `300`      | Repeat-alert suppression window             |
//! | `VITALS_POLL_INTERVAL_SECS`  | no       | run once   | Re-assess on this interval until Ctrl-C     |

use std::path::{Path, PathBuf};
use std::time::Duration;

use vitalwatch_core::alert::DEFAULT_ALERT_COOLDOWN_SECS;
use vitalwatch_core::reading::{ReadingQuery, DEFAULT_WINDOW_DAYS};
use vitalwatch_core::types::DbId;
use vitalwatch_core::{ThresholdSet, VitalType};

use crate::error::MonitorError;

pub const ENV_READINGS_PATH: &str = "VITALS_READINGS_PATH";
pub const ENV_PATIENT_ID: &str = "VITALS_PATIENT_ID";
pub const ENV_VITAL_TYPE: &str = "VITALS_TYPE";
pub const ENV_DAYS: &str = "VITALS_DAYS";
pub const ENV_THRESHOLDS_PATH: &str = "VITALS_THRESHOLDS_PATH";
pub const ENV_ALERT_COOLDOWN_SECS: &str = "VITALS_ALERT_COOLDOWN_SECS";
pub const ENV_POLL_INTERVAL_SECS: &str = "VITALS_POLL_INTERVAL_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub readings_path: PathBuf,
    pub patient_id: DbId,
    pub vital_type: Option<VitalType>,
    pub days: Option<u32>,
    pub thresholds_path: Option<PathBuf>,
    pub alert_cooldown_secs: u32,
    /// `None` runs a single assessment.
    pub poll_interval: Option<Duration>,
}

impl MonitorConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let readings_path = get(ENV_READINGS_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| MonitorError::Config(format!("{ENV_READINGS_PATH} is required")))?;

        let patient_id = get(ENV_PATIENT_ID)
            .ok_or_else(|| MonitorError::Config(format!("{ENV_PATIENT_ID} is required")))
            .and_then(|v| parse_number::<DbId>(ENV_PATIENT_ID, &v, "an integer"))?;

        let vital_type = get(ENV_VITAL_TYPE)
            .map(|v| VitalType::parse(v.trim()))
            .transpose()?;

        let days = match get(ENV_DAYS) {
            Some(v) => Some(parse_number::<u32>(ENV_DAYS, &v, "a non-negative integer")?),
            None => Some(DEFAULT_WINDOW_DAYS),
        };

        let alert_cooldown_secs = match get(ENV_ALERT_COOLDOWN_SECS) {
            Some(v) => parse_number::<u32>(ENV_ALERT_COOLDOWN_SECS, &v, "a non-negative integer")?,
            None => DEFAULT_ALERT_COOLDOWN_SECS,
        };

        let poll_interval = match get(ENV_POLL_INTERVAL_SECS) {
            Some(v) => match parse_number::<u64>(ENV_POLL_INTERVAL_SECS, &v, "a non-negative integer")? {
                0 => {
                    return Err(MonitorError::Config(format!(
                        "{ENV_POLL_INTERVAL_SECS} must be greater than zero"
                    )))
                }
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        Ok(Self {
            readings_path,
            patient_id,
            vital_type,
            days,
            thresholds_path: get(ENV_THRESHOLDS_PATH).map(PathBuf::from),
            alert_cooldown_secs,
            poll_interval,
        })
    }

    pub fn query(&self) -> ReadingQuery {
        let query = ReadingQuery::new(self.patient_id).with_days(self.days);
        match self.vital_type {
            Some(vt) => query.with_vital_type(vt),
            None => query,
        }
    }

    pub fn alert_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.alert_cooldown_secs))
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    value: &str,
    expected: &str,
) -> Result<T, MonitorError> {
    value
        .trim()
        .parse()
        .map_err(|_| MonitorError::Config(format!("{key} must be {expected}, got '{value}'")))
}

/// Load threshold overrides from `path`, or the built-in defaults when no
/// path is configured.
pub async fn load_thresholds(path: Option<&Path>) -> Result<ThresholdSet, MonitorError> {
    let Some(path) = path else {
        return Ok(ThresholdSet::defaults());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MonitorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let set = ThresholdSet::from_json(&json)?;
    tracing::info!(
        path = %path.display(),
        customized = ?set.customized_types(),
        "Loaded threshold overrides",
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = MonitorConfig::from_lookup(lookup(&[
            (ENV_READINGS_PATH, "/data/vitals.json"),
            (ENV_PATIENT_ID, "12"),
        ]))
        .unwrap();

        assert_eq!(cfg.readings_path, PathBuf::from("/data/vitals.json"));
        assert_eq!(cfg.patient_id, 12);
        assert_eq!(cfg.vital_type, None);
        assert_eq!(cfg.days, Some(DEFAULT_WINDOW_DAYS));
        assert_eq!(cfg.thresholds_path, None);
        assert_eq!(cfg.alert_cooldown_secs, DEFAULT_ALERT_COOLDOWN_SECS);
        assert_eq!(cfg.poll_interval, None);
    }

    #[test]
    fn full_config_parses_every_field() {
        let cfg = MonitorConfig::from_lookup(lookup(&[
            (ENV_READINGS_PATH, "vitals.json"),
            (ENV_PATIENT_ID, " 4 "),
            (ENV_VITAL_TYPE, "spo2"),
            (ENV_DAYS, "30"),
            (ENV_THRESHOLDS_PATH, "thresholds.json"),
            (ENV_ALERT_COOLDOWN_SECS, "60"),
            (ENV_POLL_INTERVAL_SECS, "15"),
        ]))
        .unwrap();

        assert_eq!(cfg.patient_id, 4);
        assert_eq!(cfg.vital_type, Some(VitalType::OxygenSaturation));
        assert_eq!(cfg.days, Some(30));
        assert_eq!(cfg.thresholds_path, Some(PathBuf::from("thresholds.json")));
        assert_eq!(cfg.alert_cooldown(), chrono::Duration::seconds(60));
        assert_eq!(cfg.poll_interval, Some(Duration::from_secs(15)));

        let query = cfg.query();
        assert_eq!(query.patient_id, 4);
        assert_eq!(query.vital_type, Some(VitalType::OxygenSaturation));
        assert_eq!(query.days, Some(30));
    }

    #[test]
    fn missing_required_vars_are_config_errors() {
        assert_matches!(
            MonitorConfig::from_lookup(lookup(&[(ENV_PATIENT_ID, "1")])),
            Err(MonitorError::Config(_))
        );
        assert_matches!(
            MonitorConfig::from_lookup(lookup(&[(ENV_READINGS_PATH, "v.json"), (ENV_PATIENT_ID, "")])),
            Err(MonitorError::Config(_))
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [(ENV_READINGS_PATH, "v.json"), (ENV_PATIENT_ID, "1")];

        let mut vars = base.to_vec();
        vars.push((ENV_DAYS, "a week"));
        assert_matches!(MonitorConfig::from_lookup(lookup(&vars)), Err(MonitorError::Config(_)));

        let mut vars = base.to_vec();
        vars.push((ENV_VITAL_TYPE, "glucose"));
        assert_matches!(MonitorConfig::from_lookup(lookup(&vars)), Err(MonitorError::Core(_)));

        let mut vars = base.to_vec();
        vars.push((ENV_POLL_INTERVAL_SECS, "0"));
        assert_matches!(MonitorConfig::from_lookup(lookup(&vars)), Err(MonitorError::Config(_)));
    }

    #[test]
    fn error_messages_describe_each_key() {
        let err = MonitorConfig::from_lookup(lookup(&[
            (ENV_READINGS_PATH, "v.json"),
            (ENV_PATIENT_ID, "abc"),
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: VITALS_PATIENT_ID must be an integer, got 'abc'"
        );

        let err = MonitorConfig::from_lookup(lookup(&[
            (ENV_READINGS_PATH, "v.json"),
            (ENV_PATIENT_ID, "1"),
            (ENV_DAYS, "-2"),
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: VITALS_DAYS must be a non-negative integer, got '-2'"
        );
    }

    #[test]
    fn negative_patient_id_is_accepted() {
        let cfg = MonitorConfig::from_lookup(lookup(&[
            (ENV_READINGS_PATH, "v.json"),
            (ENV_PATIENT_ID, "-3"),
        ]))
        .unwrap();
        assert_eq!(cfg.patient_id, -3);
    }

    #[tokio::test]
    async fn no_thresholds_path_means_defaults() {
        let set = load_thresholds(None).await.unwrap();
        assert_eq!(set, ThresholdSet::defaults());
    }

    #[tokio::test]
    async fn missing_thresholds_file_is_an_io_error() {
        let result = load_thresholds(Some(Path::new("/nonexistent/thresholds.json"))).await;
        assert_matches!(result, Err(MonitorError::Io { .. }));
    }
}
