//! `vitalwatch-core`: vital-sign severity classification.
//!
//! Pure domain logic with no I/O. Callers supply readings and a
//! [`ThresholdSet`](thresholds::ThresholdSet); this crate returns severity
//! verdicts, alert decisions, and display labels/units.

pub mod alert;
pub mod error;
pub mod reading;
pub mod severity;
pub mod thresholds;
pub mod types;
pub mod vital_type;

pub use error::CoreError;
pub use severity::{classify, Severity};
pub use thresholds::{default_thresholds, ThresholdBand, ThresholdConfig, ThresholdSet};
pub use vital_type::{label, unit, VitalType};
