//! `vitalwatch-monitor` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod error;
pub mod monitor;
pub mod source;

pub use error::MonitorError;
