//! Batch training pipeline: records -> features -> fitted forest -> artifact.
//!
//! Labels present on the input records are used only for the offline
//! evaluation report; fitting itself is unsupervised.

use crate::error::PipelineError;
use crate::evaluation::{evaluate, EvaluationReport};
use crate::feature_extractor::FeatureExtractor;
use crate::model::artifact::{ModelArtifact, TrainingMetadata};
use crate::model::forest::{ForestParams, IsolationForest};
use crate::types::transaction::TransactionRecord;
use chrono::Utc;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Result of one training run.
#[derive(Debug)]
pub struct TrainingOutcome {
    /// Versioned, self-describing model artifact
    pub artifact: ModelArtifact,
    /// Offline metrics, present when the input carried ground-truth labels
    pub evaluation: Option<EvaluationReport>,
}

/// Orchestrates a single training run over a batch of historical records.
pub struct TrainingPipeline {
    extractor: FeatureExtractor,
    params: ForestParams,
}

impl TrainingPipeline {
    /// Create a pipeline with the given forest hyperparameters.
    pub fn new(params: ForestParams) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            params,
        }
    }

    /// Fit a model on `records` and package it as an artifact.
    ///
    /// Any extraction failure aborts the run; no partial model is produced.
    pub fn run(&self, records: &[TransactionRecord]) -> Result<TrainingOutcome, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let matrix: Vec<Vec<f64>> = records
            .iter()
            .map(|record| self.extractor.extract(record))
            .collect::<Result<_, _>>()?;

        info!(
            rows = matrix.len(),
            n_estimators = self.params.n_estimators,
            contamination = self.params.contamination,
            seed = self.params.seed,
            "Fitting isolation forest"
        );

        let forest = IsolationForest::fit(&matrix, self.extractor.feature_names(), &self.params)?;

        info!(
            threshold = forest.threshold(),
            subsample_size = forest.subsample_size(),
            "Model training complete"
        );

        let evaluation = self.evaluate_if_labeled(&forest, records, &matrix)?;

        let artifact = ModelArtifact::from_forest(
            &forest,
            TrainingMetadata {
                training_rows: matrix.len(),
                seed: self.params.seed,
                trained_at: Utc::now(),
            },
        );

        Ok(TrainingOutcome {
            artifact,
            evaluation,
        })
    }

    /// Score the labeled subset of the training data against its labels.
    fn evaluate_if_labeled(
        &self,
        forest: &IsolationForest,
        records: &[TransactionRecord],
        matrix: &[Vec<f64>],
    ) -> Result<Option<EvaluationReport>, PipelineError> {
        let mut predictions = Vec::new();
        let mut labels = Vec::new();

        for (record, features) in records.iter().zip(matrix) {
            if let Some(label) = record.is_fraud {
                predictions.push(forest.predict(features)?);
                labels.push(label);
            }
        }

        if labels.is_empty() {
            warn!("No ground-truth labels present, skipping evaluation");
            return Ok(None);
        }

        let report = evaluate(&predictions, &labels, forest.threshold());
        info!(
            labeled = labels.len(),
            accuracy = report.accuracy,
            precision = report.precision,
            recall = report.recall,
            f1 = report.f1,
            "Offline evaluation complete"
        );

        Ok(Some(report))
    }
}

/// Load newline-delimited JSON transaction records from a file.
pub fn load_records_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionRecord>, PipelineError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TransactionRecord = serde_json::from_str(&line).map_err(|e| {
            PipelineError::Schema(format!("line {}: {}", line_no + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    fn record(id: usize, amount: f64, hour: u32, is_fraud: bool) -> TransactionRecord {
        TransactionRecord::new(
            format!("tx_{id:06}"),
            format!("user_{}", id % 50),
            amount,
            Utc.with_ymd_and_hms(2024, 5, 1, hour, 15, 0).unwrap(),
        )
        .with_label(is_fraud)
    }

    /// 950 normal records clustered near amount 100 plus 50 high-amount
    /// small-hours anomalies, mirroring the synthetic event source.
    fn synthetic_batch() -> Vec<TransactionRecord> {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut records = Vec::with_capacity(1000);

        for i in 0..950 {
            // Approximate Normal(100, 50) from summed uniforms, floored at 1
            let noise: f64 = (0..12).map(|_| rng.gen_range(0.0..1.0)).sum::<f64>() - 6.0;
            let amount = (100.0 + 50.0 * noise).max(1.0);
            let hour = rng.gen_range(0..24);
            records.push(record(i, amount, hour, false));
        }
        for i in 950..1000 {
            let noise: f64 = (0..12).map(|_| rng.gen_range(0.0..1.0)).sum::<f64>() - 6.0;
            let amount = (5000.0 + 2000.0 * noise).max(3000.0);
            let small_hours = [0, 1, 2, 3, 22, 23];
            let hour = small_hours[rng.gen_range(0..small_hours.len())];
            records.push(record(i, amount, hour, true));
        }

        records
    }

    fn params(contamination: f64) -> ForestParams {
        ForestParams {
            contamination,
            seed: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_rejects_empty_batch() {
        let pipeline = TrainingPipeline::new(params(0.01));
        let err = pipeline.run(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn test_run_aborts_on_malformed_record() {
        let mut records = synthetic_batch();
        records[10].amount = f64::NAN;

        let pipeline = TrainingPipeline::new(params(0.01));
        let err = pipeline.run(&records).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_recall_on_synthetic_anomalies_exceeds_point_six() {
        let records = synthetic_batch();
        let pipeline = TrainingPipeline::new(params(0.05));

        let outcome = pipeline.run(&records).unwrap();
        let report = outcome.evaluation.expect("batch is fully labeled");

        assert!(
            report.recall > 0.6,
            "expected recall > 0.6 on injected anomalies, got {}",
            report.recall
        );
    }

    #[test]
    fn test_unlabeled_batch_skips_evaluation() {
        let records: Vec<TransactionRecord> = synthetic_batch()
            .into_iter()
            .map(|mut r| {
                r.is_fraud = None;
                r
            })
            .collect();

        let pipeline = TrainingPipeline::new(params(0.05));
        let outcome = pipeline.run(&records).unwrap();

        assert!(outcome.evaluation.is_none());
        assert_eq!(outcome.artifact.metadata.training_rows, 1000);
    }

    #[test]
    fn test_artifact_schema_matches_extractor() {
        let records = synthetic_batch();
        let pipeline = TrainingPipeline::new(params(0.05));
        let outcome = pipeline.run(&records).unwrap();

        assert_eq!(
            outcome.artifact.feature_names,
            vec!["amount".to_string(), "transaction_hour".to_string()]
        );
    }

    #[test]
    fn test_load_records_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"transaction_id":"tx_1","user_id":"u_1","amount":100.0,"timestamp":"2024-05-01T10:00:00Z"}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"transaction_id":"tx_2","user_id":"u_2","amount":9000.0,"timestamp":"2024-05-01T03:00:00Z","is_fraud":true}}"#
        )
        .unwrap();

        let records = load_records_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].is_fraud, Some(true));
    }

    #[test]
    fn test_load_records_jsonl_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "not json").unwrap();

        let err = load_records_jsonl(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
