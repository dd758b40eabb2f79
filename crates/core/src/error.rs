#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown vital type: {0}")]
    UnknownVitalType(String),

    #[error("Malformed thresholds for {vital_type}: {reason}")]
    MalformedThresholds { vital_type: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}
