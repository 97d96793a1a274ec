//! NATS message producer for anomaly alerts

use crate::types::alert::AnomalyAlert;
use anyhow::Result;
use async_nats::Client;
use tracing::{debug, error};

/// Producer for publishing anomaly alerts to NATS
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    /// Create a new alert producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish an anomaly alert
    pub async fn publish(&self, alert: &AnomalyAlert) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            transaction_id = %alert.transaction_id,
            anomaly_score = alert.anomaly_score,
            "Published anomaly alert"
        );

        Ok(())
    }

    /// Publish multiple alerts, logging failures without aborting the batch
    pub async fn publish_batch(&self, alerts: &[AnomalyAlert]) -> Result<()> {
        for alert in alerts {
            if let Err(e) = self.publish(alert).await {
                error!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to publish alert"
                );
            }
        }
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
