//! Offline Training Entry Point
//!
//! Loads historical transaction records, fits the isolation forest, reports
//! offline evaluation metrics, and writes the versioned model artifact.

use anomaly_detection_pipeline::{config::AppConfig, training, TrainingPipeline};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anomaly_detection_pipeline=info".parse()?)
                .add_directive("train=info".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let config = AppConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    info!(
        data_path = %config.training.data_path,
        n_estimators = config.training.n_estimators,
        contamination = config.training.contamination,
        "Starting training run"
    );

    let records = training::load_records_jsonl(&config.training.data_path)
        .with_context(|| format!("Failed to load records from {}", config.training.data_path))?;
    info!(records = records.len(), "Training records loaded");

    let pipeline = TrainingPipeline::new(config.training.forest_params());
    let outcome = pipeline.run(&records)?;

    if let Some(report) = &outcome.evaluation {
        info!(
            accuracy = format!("{:.4}", report.accuracy),
            precision = format!("{:.4}", report.precision),
            recall = format!("{:.4}", report.recall),
            f1 = format!("{:.4}", report.f1),
            threshold = report.threshold,
            "Evaluation metrics"
        );
    }

    let artifact_path = Path::new(&config.model.artifact_path);
    if let Some(parent) = artifact_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    outcome.artifact.save(artifact_path)?;
    info!(path = %artifact_path.display(), "Model artifact written");

    Ok(())
}
