//! Anomaly Detection Pipeline - Main Entry Point
//!
//! Consumes transactions from NATS, scores them against a trained isolation
//! forest, and publishes anomaly alerts. A failure on one record is logged
//! and never halts processing of the stream.

use anomaly_detection_pipeline::{
    config::AppConfig,
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    model::ModelArtifact,
    producer::AlertProducer,
    scoring::ScoringService,
    types::alert::{AnomalyAlert, Severity},
    TransactionRecord,
};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anomaly_detection_pipeline=info".parse()?),
        )
        .init();

    info!("Starting anomaly detection pipeline");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Load the trained model artifact and stand up the scoring service
    let artifact = ModelArtifact::load(&config.model.artifact_path)
        .with_context(|| format!("Failed to load artifact from {}", config.model.artifact_path))?;
    info!(
        n_estimators = artifact.n_estimators,
        contamination = artifact.contamination,
        threshold = artifact.threshold,
        "Model artifact loaded"
    );

    let scoring_service = Arc::new(ScoringService::new(artifact)?);

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize consumer and producer
    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(AlertProducer::new(client.clone(), &config.nats.alert_subject));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting transaction processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", config.nats.transaction_subject);
    info!("Publishing alerts to: {}", config.nats.alert_subject);

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    // Wrap config in Arc for sharing
    let config = Arc::new(config);

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let interval = config.pipeline.metrics_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, interval);
        reporter.start().await;
    });

    // Process transactions with per-record failure isolation
    let mut subscription = match &config.pipeline.queue_group {
        Some(group) => consumer.subscribe_queue(group).await?,
        None => consumer.subscribe().await?,
    };

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let scoring_service = scoring_service.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let record = match serde_json::from_slice::<TransactionRecord>(&message.payload) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize transaction");
                    metrics.record_error();
                    drop(permit);
                    return;
                }
            };

            let tx_id = record.transaction_id.clone();

            match scoring_service.score_one(&record) {
                Ok(result) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_transaction(processing_time, result.anomaly_score);

                    if result.is_anomaly {
                        let severity = Severity::from_score(
                            result.anomaly_score,
                            result.threshold,
                            &config.model.severity,
                        );
                        let alert = AnomalyAlert::new(
                            record.transaction_id.clone(),
                            record.user_id.clone(),
                            result.anomaly_score,
                            result.threshold,
                            severity,
                            record.amount,
                            record.timestamp,
                        );

                        metrics.record_alert(&format!("{:?}", severity).to_lowercase());

                        if let Err(e) = producer.publish(&alert).await {
                            error!(
                                transaction_id = %tx_id,
                                error = %e,
                                "Failed to publish anomaly alert"
                            );
                        } else {
                            info!(
                                transaction_id = %tx_id,
                                anomaly_score = result.anomaly_score,
                                severity = ?severity,
                                processing_time_us = processing_time.as_micros(),
                                "Anomaly alert published"
                            );
                        }
                    } else {
                        debug!(
                            transaction_id = %tx_id,
                            anomaly_score = result.anomaly_score,
                            processing_time_us = processing_time.as_micros(),
                            "Transaction scored normal"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

                    // Log progress every 100 transactions
                    if count % 100 == 0 {
                        let throughput = metrics.get_throughput();
                        let processing_stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} tx/s", throughput),
                            avg_latency_us = processing_stats.mean_us,
                            "Processing milestone"
                        );
                    }
                }
                Err(e) => {
                    // Per-record failure isolation: log and keep consuming
                    error!(
                        transaction_id = %tx_id,
                        error = %e,
                        "Scoring failed"
                    );
                    metrics.record_error();
                }
            }

            drop(permit);
        });
    }

    // Print final summary
    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
