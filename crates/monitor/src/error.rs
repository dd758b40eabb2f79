use std::path::PathBuf;

use vitalwatch_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed record: {0}")]
    Record(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
