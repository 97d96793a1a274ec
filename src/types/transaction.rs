//! Transaction data structures for anomaly detection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw transaction event to be scored for anomalies.
///
/// Produced by the external event source; immutable once created.
/// `is_fraud` is a ground-truth label used only for offline evaluation,
/// never for training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction identifier
    pub transaction_id: String,

    /// Identifier of the user who made the transaction
    pub user_id: String,

    /// Monetary amount (non-negative)
    pub amount: f64,

    /// Transaction timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// Device type, e.g. "mobile", "desktop", "tablet"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,

    /// Merchant identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,

    /// Originating IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Ground-truth fraud label, evaluation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fraud: Option<bool>,
}

impl TransactionRecord {
    /// Create a record with the required fields populated.
    pub fn new(
        transaction_id: String,
        user_id: String,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            amount,
            timestamp,
            device_type: None,
            merchant_id: None,
            ip_address: None,
            is_fraud: None,
        }
    }

    /// Attach a ground-truth fraud label.
    pub fn with_label(mut self, is_fraud: bool) -> Self {
        self.is_fraud = Some(is_fraud);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_serialization_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        let record = TransactionRecord::new("tx_123".to_string(), "user_42".to_string(), 250.0, ts);

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: TransactionRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record.transaction_id, deserialized.transaction_id);
        assert_eq!(record.user_id, deserialized.user_id);
        assert_eq!(record.amount, deserialized.amount);
        assert_eq!(record.timestamp, deserialized.timestamp);
        assert!(deserialized.is_fraud.is_none());
    }

    #[test]
    fn test_optional_fields_accepted() {
        let json = r#"{
            "transaction_id": "tx_1",
            "user_id": "u_1",
            "amount": 99.5,
            "timestamp": "2024-05-01T02:15:00Z",
            "device_type": "mobile",
            "merchant_id": "m_17",
            "is_fraud": true
        }"#;

        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.device_type.as_deref(), Some("mobile"));
        assert_eq!(record.is_fraud, Some(true));
        assert!(record.ip_address.is_none());
    }
}
