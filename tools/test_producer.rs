//! Test Transaction Producer
//!
//! Generates and publishes synthetic transactions to NATS for pipeline
//! testing: mostly normal amounts with an occasional high-amount anomaly,
//! labeled so the stream can double as evaluation data.

use anomaly_detection_pipeline::{config::AppConfig, TransactionRecord};
use anyhow::Result;
use chrono::{Timelike, Utc};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    transaction_counter: u64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            transaction_counter: 0,
        }
    }

    /// Generate a random legitimate transaction
    fn generate_legitimate(&mut self) -> TransactionRecord {
        self.transaction_counter += 1;

        let mut record = TransactionRecord::new(
            format!("tx_{:012}", self.transaction_counter),
            format!("user_{}", self.rng.gen_range(1000..5000)),
            self.rng.gen_range(10.0..1000.0),
            Utc::now(),
        )
        .with_label(false);

        record.device_type = Some(
            self.random_choice(&["mobile", "desktop", "tablet"])
                .to_string(),
        );
        record.merchant_id = Some(format!("merchant_{}", self.rng.gen_range(1..100)));
        record.ip_address = Some(format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        ));

        record
    }

    /// Generate an anomalous transaction: high amount at a small-hours time,
    /// so both model features sit outside the normal cluster
    fn generate_anomalous(&mut self) -> TransactionRecord {
        let mut record = self.generate_legitimate();
        record.amount = self.rng.gen_range(5000.0..20000.0);

        let small_hours: [u32; 6] = [0, 1, 2, 3, 22, 23];
        let hour = small_hours[self.rng.gen_range(0..small_hours.len())];
        record.timestamp = record.timestamp.with_hour(hour).unwrap_or(record.timestamp);

        record.is_fraud = Some(true);
        record
    }

    /// Generate the next transaction (~1% anomalous)
    fn next(&mut self) -> TransactionRecord {
        if self.rng.gen_bool(0.01) {
            self.generate_anomalous()
        } else {
            self.generate_legitimate()
        }
    }

    fn random_choice<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[self.rng.gen_range(0..options.len())]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;

    let client = async_nats::connect(&config.nats.url).await?;
    info!(
        url = %config.nats.url,
        subject = %config.nats.transaction_subject,
        "Connected to NATS, starting transaction generation"
    );

    let mut generator = TransactionGenerator::new();
    let mut published = 0u64;

    loop {
        let record = generator.next();
        let payload = serde_json::to_vec(&record)?;

        if let Err(e) = client
            .publish(config.nats.transaction_subject.clone(), payload.into())
            .await
        {
            warn!(error = %e, "Failed to publish transaction");
        } else {
            published += 1;
            if record.is_fraud == Some(true) {
                info!(
                    transaction_id = %record.transaction_id,
                    amount = record.amount,
                    "Published anomalous transaction"
                );
            }
            if published % 100 == 0 {
                info!(published, "Publishing milestone");
            }
        }

        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(100..500)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legitimate_records_stay_in_normal_range() {
        let mut generator = TransactionGenerator::new();
        for _ in 0..50 {
            let record = generator.generate_legitimate();
            assert!(record.amount >= 10.0 && record.amount < 1000.0);
            assert_eq!(record.is_fraud, Some(false));
        }
    }

    #[test]
    fn test_anomalous_records_use_high_amounts_and_small_hours() {
        let mut generator = TransactionGenerator::new();
        for _ in 0..50 {
            let record = generator.generate_anomalous();
            assert!(record.amount >= 5000.0 && record.amount < 20000.0);
            assert!(
                matches!(record.timestamp.hour(), 0..=3 | 22 | 23),
                "hour {} is not in the anomalous window",
                record.timestamp.hour()
            );
            assert_eq!(record.is_fraud, Some(true));
        }
    }
}
