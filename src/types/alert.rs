//! Anomaly alert data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity classification for an anomaly alert.
///
/// Scores follow the lower-is-anomalous convention, so severity grows with
/// the margin by which the score falls below the decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Classify an anomalous score by its margin below the threshold.
    pub fn from_score(anomaly_score: f64, threshold: f64, thresholds: &SeverityThresholds) -> Self {
        let margin = threshold - anomaly_score;
        if margin >= thresholds.high {
            Severity::High
        } else if margin >= thresholds.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Configurable severity margins (distance below the decision threshold).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: 0.05,
            high: 0.15,
        }
    }
}

/// Alert generated when a transaction is classified anomalous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// User who made the transaction
    pub user_id: String,

    /// Raw anomaly score (lower = more anomalous)
    pub anomaly_score: f64,

    /// Decision threshold the score fell below
    pub threshold: f64,

    /// Severity classification
    pub severity: Severity,

    /// Transaction amount
    pub amount: f64,

    /// Transaction timestamp
    pub transaction_timestamp: DateTime<Utc>,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl AnomalyAlert {
    /// Create a new alert for an anomalous transaction.
    pub fn new(
        transaction_id: String,
        user_id: String,
        anomaly_score: f64,
        threshold: f64,
        severity: Severity,
        amount: f64,
        transaction_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            transaction_id,
            user_id,
            anomaly_score,
            threshold,
            severity,
            amount,
            transaction_timestamp,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_score() {
        let thresholds = SeverityThresholds::default();
        let decision_threshold = 0.0;

        // Just below the threshold
        assert_eq!(
            Severity::from_score(-0.01, decision_threshold, &thresholds),
            Severity::Low
        );
        assert_eq!(
            Severity::from_score(-0.07, decision_threshold, &thresholds),
            Severity::Medium
        );
        assert_eq!(
            Severity::from_score(-0.20, decision_threshold, &thresholds),
            Severity::High
        );
    }

    #[test]
    fn test_alert_serialization() {
        let alert = AnomalyAlert::new(
            "tx_123".to_string(),
            "user_9".to_string(),
            -0.12,
            -0.02,
            Severity::Medium,
            8_500.0,
            Utc::now(),
        );

        let json = serde_json::to_string(&alert).unwrap();
        let deserialized: AnomalyAlert = serde_json::from_str(&json).unwrap();

        assert_eq!(alert.transaction_id, deserialized.transaction_id);
        assert_eq!(alert.anomaly_score, deserialized.anomaly_score);
        assert_eq!(alert.severity, deserialized.severity);
    }
}
