//! NATS message consumer for incoming transaction records

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving transaction records from NATS.
///
/// Delivery is at-least-once; duplicate records are tolerated downstream and
/// no deduplication happens here.
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    /// Create a new transaction consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Subscribe as part of a queue group, so multiple pipeline instances
    /// share the stream instead of each receiving every record
    pub async fn subscribe_queue(&self, group: &str) -> Result<Subscriber> {
        let subscriber = self
            .client
            .queue_subscribe(self.subject.clone(), group.to_string())
            .await?;
        info!(
            subject = %self.subject,
            group = %group,
            "Subscribed to transaction subject in queue group"
        );
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
