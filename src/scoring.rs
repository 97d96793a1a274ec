//! Scoring service: holds a loaded model and answers scoring requests.
//!
//! The loaded forest is immutable and shared read-only, so any number of
//! scoring calls may run concurrently without coordination. Only swapping in
//! a retrained artifact takes the write half of the handle lock, and then
//! only to replace an `Arc`; in-flight calls see either the old or the new
//! model, never a mix.

use crate::error::PipelineError;
use crate::feature_extractor::FeatureExtractor;
use crate::model::artifact::ModelArtifact;
use crate::model::forest::IsolationForest;
use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Outcome of scoring a single transaction.
///
/// Carries the threshold of the model that produced the score, so callers
/// acting on the result (alerting, severity classification) work from one
/// consistent snapshot even if the loaded model is swapped concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Source record identifier for correlation
    pub transaction_id: String,
    /// Raw anomaly score (lower = more anomalous)
    pub anomaly_score: f64,
    /// Whether the score fell below the model's threshold
    pub is_anomaly: bool,
    /// Decision threshold of the model that scored this record
    pub threshold: f64,
}

/// One-instance scoring front end over a loaded [`ModelArtifact`].
#[derive(Debug)]
pub struct ScoringService {
    extractor: FeatureExtractor,
    model: RwLock<Arc<IsolationForest>>,
}

impl ScoringService {
    /// Load an artifact and validate its feature schema against the live
    /// extractor. This is the train/serve parity check: a model trained on a
    /// different schema is rejected here, before any request is scored.
    pub fn new(artifact: ModelArtifact) -> Result<Self, PipelineError> {
        let extractor = FeatureExtractor::new();
        let forest = Self::validate_and_build(&extractor, artifact)?;

        Ok(Self {
            extractor,
            model: RwLock::new(Arc::new(forest)),
        })
    }

    fn validate_and_build(
        extractor: &FeatureExtractor,
        artifact: ModelArtifact,
    ) -> Result<IsolationForest, PipelineError> {
        let expected = extractor.feature_names();
        if artifact.feature_names != expected {
            return Err(PipelineError::ModelSchema(format!(
                "artifact trained on {:?}, extractor emits {:?}",
                artifact.feature_names, expected
            )));
        }

        info!(
            n_estimators = artifact.n_estimators,
            threshold = artifact.threshold,
            trained_at = %artifact.metadata.trained_at,
            "Model artifact loaded"
        );

        artifact.to_forest()
    }

    /// Score a single transaction record.
    pub fn score_one(&self, record: &TransactionRecord) -> Result<ScoringResult, PipelineError> {
        let features = self.extractor.extract(record)?;
        let model = self.current_model();

        let anomaly_score = model.decision_function(&features)?;

        Ok(ScoringResult {
            transaction_id: record.transaction_id.clone(),
            anomaly_score,
            is_anomaly: anomaly_score < model.threshold(),
            threshold: model.threshold(),
        })
    }

    /// Score a batch of records; one failing record never blocks the others.
    pub fn score_batch(
        &self,
        records: &[TransactionRecord],
    ) -> Vec<Result<ScoringResult, PipelineError>> {
        records.iter().map(|record| self.score_one(record)).collect()
    }

    /// Atomically replace the loaded model with a retrained artifact.
    pub fn swap_artifact(&self, artifact: ModelArtifact) -> Result<(), PipelineError> {
        let forest = Self::validate_and_build(&self.extractor, artifact)?;

        let mut guard = self
            .model
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(forest);

        info!("Model artifact swapped");
        Ok(())
    }

    /// Decision threshold of the currently loaded model.
    pub fn threshold(&self) -> f64 {
        self.current_model().threshold()
    }

    fn current_model(&self) -> Arc<IsolationForest> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
