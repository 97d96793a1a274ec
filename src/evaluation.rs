//! Offline classification metrics against ground-truth fraud labels.
//!
//! Pure reporting; never feeds back into training. Labels are only ever used
//! here.

use serde::{Deserialize, Serialize};

/// Classification metrics for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Decision threshold the predictions were made with
    pub threshold: f64,
}

/// Compare predicted anomaly flags against ground-truth labels.
///
/// Division is zero-safe: precision, recall, and F1 are 0.0 rather than an
/// error when there are no positive predictions or no positive labels.
///
/// # Panics
///
/// Panics if `predictions` and `labels` have different lengths; callers pair
/// them from the same record batch.
pub fn evaluate(predictions: &[bool], labels: &[bool], threshold: f64) -> EvaluationReport {
    assert_eq!(
        predictions.len(),
        labels.len(),
        "predictions and labels must be paired"
    );

    let mut tp = 0u64;
    let mut tn = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;

    for (&pred, &label) in predictions.iter().zip(labels) {
        match (pred, label) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => tn += 1,
        }
    }

    let total = predictions.len() as f64;
    let accuracy = if total > 0.0 {
        (tp + tn) as f64 / total
    } else {
        0.0
    };
    let precision = safe_ratio(tp, tp + fp);
    let recall = safe_ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationReport {
        accuracy,
        precision,
        recall,
        f1,
        threshold,
    }
}

fn safe_ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
