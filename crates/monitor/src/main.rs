//! `vitalwatch-monitor`: assesses a patient's vital signs against tiered
//! thresholds and reports abnormal readings.
//!
//! Reads readings from a JSON file, classifies each one, logs alerts, and
//! prints the report as JSON on stdout. See [`vitalwatch_monitor::config`]
//! for the environment variables.

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitalwatch_core::alert::AlertSuppressor;
use vitalwatch_monitor::config::{load_thresholds, MonitorConfig};
use vitalwatch_monitor::monitor::{self, MonitorReport};
use vitalwatch_monitor::source::JsonFileSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitalwatch_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = MonitorConfig::from_env()?;
    let thresholds = load_thresholds(config.thresholds_path.as_deref()).await?;
    let source = JsonFileSource::new(&config.readings_path);
    let query = config.query();
    let mut suppressor = AlertSuppressor::with_cooldown(config.alert_cooldown());

    tracing::info!(
        patient_id = config.patient_id,
        readings_path = %config.readings_path.display(),
        vital_type = ?config.vital_type,
        days = ?config.days,
        "Starting vitalwatch-monitor",
    );

    match config.poll_interval {
        Some(interval) => {
            monitor::watch(
                &source,
                &query,
                &thresholds,
                suppressor,
                interval,
                print_report,
                shutdown_signal(),
            )
            .await;
        }
        None => {
            let report =
                monitor::run_once(&source, &query, &thresholds, &mut suppressor, Utc::now()).await?;
            print_report(&report);
        }
    }

    Ok(())
}

fn print_report(report: &MonitorReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize report"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
