//! Feature extraction for transaction anomaly scoring.
//!
//! The same extractor runs at training and at serve time; the feature names
//! and their order are part of the trained model's contract, so any change
//! here invalidates previously trained artifacts.

use crate::error::PipelineError;
use crate::types::transaction::TransactionRecord;
use chrono::Timelike;

/// Ordered feature schema emitted by the extractor.
pub const FEATURE_NAMES: [&str; 2] = ["amount", "transaction_hour"];

/// Transforms transaction records into fixed-order numeric feature vectors.
///
/// Stateless and deterministic. Hour-of-day is taken from the record's UTC
/// timestamp; records already carry `DateTime<Utc>`, so offsets were
/// normalized at the serde boundary.
#[derive(Debug)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector `[amount, transaction_hour]` from a record.
    ///
    /// Fails with a schema error when the amount is negative or non-finite.
    pub fn extract(&self, record: &TransactionRecord) -> Result<Vec<f64>, PipelineError> {
        if !record.amount.is_finite() {
            return Err(PipelineError::Schema(format!(
                "transaction {} has non-finite amount",
                record.transaction_id
            )));
        }
        if record.amount < 0.0 {
            return Err(PipelineError::Schema(format!(
                "transaction {} has negative amount {}",
                record.transaction_id, record.amount
            )));
        }

        let hour = record.timestamp.hour() as f64;

        Ok(vec![record.amount, hour])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get the ordered feature names.
    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
