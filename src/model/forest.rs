//! Isolation forest for unsupervised transaction anomaly detection.
//!
//! Isolation forests isolate anomalies by randomly partitioning the feature
//! space: outlying points end up in leaves after fewer splits than points
//! inside dense regions, so shorter average path lengths mean "more
//! anomalous".
//!
//! Score convention: the decision function is `0.5 - s(x)` where `s` is the
//! textbook isolation score in (0, 1]. Lower values are more anomalous, and a
//! point is classified anomalous when its score falls below the
//! contamination-calibrated threshold. The convention is recorded in the
//! serialized artifact.
//!
//! Reference: Liu, Ting & Zhou (2008), "Isolation Forest", ICDM.

use crate::error::PipelineError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Default number of trees in the ensemble.
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default per-tree subsample cap (following the original paper).
pub const DEFAULT_SUBSAMPLE_SIZE: usize = 256;

/// Default expected fraction of anomalies in the training data.
pub const DEFAULT_CONTAMINATION: f64 = 0.01;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Hyperparameters for fitting an isolation forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Rows subsampled per tree; capped at the training-set size
    pub subsample_size: usize,
    /// Expected fraction of anomalies, used to calibrate the threshold
    pub contamination: f64,
    /// Seed for the tree-construction RNG
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            subsample_size: DEFAULT_SUBSAMPLE_SIZE,
            contamination: DEFAULT_CONTAMINATION,
            seed: 42,
        }
    }
}

/// A node in an isolation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum TreeNode {
    /// Internal split node
    Internal {
        feature_index: usize,
        split_value: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    /// Leaf holding the remaining subsample size and its depth
    Leaf { size: usize, depth: usize },
}

impl TreeNode {
    /// Path length from the root to the leaf this sample lands in, with the
    /// size-correction term for unresolved leaf populations.
    fn path_length(&self, sample: &[f64]) -> f64 {
        match self {
            TreeNode::Internal {
                feature_index,
                split_value,
                left,
                right,
            } => {
                if sample[*feature_index] < *split_value {
                    left.path_length(sample)
                } else {
                    right.path_length(sample)
                }
            }
            TreeNode::Leaf { size, depth } => *depth as f64 + average_path_length(*size),
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points:
/// `c(n) = 2H(n-1) - 2(n-1)/n`, with the harmonic number approximated by
/// `H(n) ~ ln(n) + gamma`.
pub(crate) fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    2.0 * (((n - 1) as f64).ln() + EULER_GAMMA) - 2.0 * (n - 1) as f64 / n as f64
}

/// A single isolation tree built over a random subsample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    pub(crate) root: TreeNode,
}

impl IsolationTree {
    /// Build a tree over the rows of `matrix` selected by `indices`.
    fn build(matrix: &[Vec<f64>], indices: Vec<usize>, max_depth: usize, rng: &mut ChaCha8Rng) -> Self {
        let root = Self::build_node(matrix, indices, 0, max_depth, rng);
        IsolationTree { root }
    }

    fn build_node(
        matrix: &[Vec<f64>],
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        if indices.len() <= 1 || depth >= max_depth {
            return TreeNode::Leaf {
                size: indices.len(),
                depth,
            };
        }

        let num_features = matrix[indices[0]].len();
        let feature_index = rng.gen_range(0..num_features);

        let mut min_val = f64::INFINITY;
        let mut max_val = f64::NEG_INFINITY;
        for &i in &indices {
            let val = matrix[i][feature_index];
            min_val = min_val.min(val);
            max_val = max_val.max(val);
        }

        // Constant feature within this partition, nothing left to isolate on
        if max_val <= min_val {
            return TreeNode::Leaf {
                size: indices.len(),
                depth,
            };
        }

        let split_value = rng.gen_range(min_val..max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| matrix[i][feature_index] < split_value);

        if left_indices.is_empty() || right_indices.is_empty() {
            let size = left_indices.len() + right_indices.len();
            return TreeNode::Leaf { size, depth };
        }

        let left = Box::new(Self::build_node(matrix, left_indices, depth + 1, max_depth, rng));
        let right = Box::new(Self::build_node(matrix, right_indices, depth + 1, max_depth, rng));

        TreeNode::Internal {
            feature_index,
            split_value,
            left,
            right,
        }
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        self.root.path_length(sample)
    }
}

/// Trained isolation-forest ensemble.
///
/// Immutable after `fit`; safe to share read-only across any number of
/// concurrent scoring calls.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    feature_names: Vec<String>,
    subsample_size: usize,
    contamination: f64,
    threshold: f64,
}

impl IsolationForest {
    /// Fit an ensemble on a feature matrix.
    ///
    /// Every row must match `feature_names` in length and order. Each tree is
    /// built from an independent subsample without replacement, with its RNG
    /// derived from `params.seed` plus the tree index, so fitting with the
    /// same seed is bit-for-bit reproducible.
    pub fn fit(
        matrix: &[Vec<f64>],
        feature_names: Vec<String>,
        params: &ForestParams,
    ) -> Result<Self, PipelineError> {
        if matrix.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }
        for (row, features) in matrix.iter().enumerate() {
            if features.len() != feature_names.len() {
                return Err(PipelineError::ModelSchema(format!(
                    "training row {} has {} features, schema has {}",
                    row,
                    features.len(),
                    feature_names.len()
                )));
            }
            for (column, value) in features.iter().enumerate() {
                if !value.is_finite() {
                    return Err(PipelineError::InvalidFeature { row, column });
                }
            }
        }

        let n_estimators = params.n_estimators.max(1);
        let subsample_size = params.subsample_size.min(matrix.len()).max(1);
        let max_depth = (subsample_size as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(n_estimators);
        for tree_idx in 0..n_estimators {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_idx as u64));
            let indices = sample_without_replacement(matrix.len(), subsample_size, &mut rng);
            trees.push(IsolationTree::build(matrix, indices, max_depth, &mut rng));
        }

        let mut forest = Self {
            trees,
            feature_names,
            subsample_size,
            contamination: params.contamination,
            threshold: 0.0,
        };
        forest.threshold = forest.calibrate_threshold(matrix, params.contamination);

        Ok(forest)
    }

    /// Derive the decision threshold so that a `contamination` fraction of
    /// the training points scores below it.
    fn calibrate_threshold(&self, matrix: &[Vec<f64>], contamination: f64) -> f64 {
        let mut scores: Vec<f64> = matrix
            .iter()
            .map(|row| self.decision_function_unchecked(row))
            .collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = scores.len();
        let k = ((contamination * n as f64).round() as usize).min(n);

        if k == 0 {
            scores[0]
        } else if k == n {
            scores[n - 1] + 1e-9
        } else {
            (scores[k - 1] + scores[k]) / 2.0
        }
    }

    /// Anomaly score for a feature vector (lower = more anomalous).
    ///
    /// Validates the vector against the trained schema; O(trees * depth)
    /// regardless of training-set size.
    pub fn decision_function(&self, features: &[f64]) -> Result<f64, PipelineError> {
        if features.len() != self.feature_names.len() {
            return Err(PipelineError::ModelSchema(format!(
                "expected {} features {:?}, got {}",
                self.feature_names.len(),
                self.feature_names,
                features.len()
            )));
        }
        Ok(self.decision_function_unchecked(features))
    }

    fn decision_function_unchecked(&self, features: &[f64]) -> f64 {
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(features))
            .sum::<f64>()
            / self.trees.len() as f64;

        // c(1) is 0; fall back to 1 so degenerate single-point subsamples
        // still produce a finite score
        let c = average_path_length(self.subsample_size);
        let norm = if c > 0.0 { c } else { 1.0 };
        let textbook_score = 2f64.powf(-avg_path / norm);

        0.5 - textbook_score
    }

    /// Classify a feature vector against the calibrated threshold.
    pub fn predict(&self, features: &[f64]) -> Result<bool, PipelineError> {
        Ok(self.decision_function(features)? < self.threshold)
    }

    /// Ordered feature schema the forest was trained with.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Calibrated decision threshold (scores below it are anomalous).
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of trees in the ensemble.
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Subsample size each tree was built from.
    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// Contamination rate the threshold was calibrated for.
    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub(crate) fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Reassemble a forest from artifact parts.
    pub(crate) fn from_parts(
        trees: Vec<IsolationTree>,
        feature_names: Vec<String>,
        subsample_size: usize,
        contamination: f64,
        threshold: f64,
    ) -> Self {
        Self {
            trees,
            feature_names,
            subsample_size,
            contamination,
            threshold,
        }
    }
}

/// Draw `count` distinct indices from `0..n` via a partial Fisher-Yates
/// shuffle.
fn sample_without_replacement(n: usize, count: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..count {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(count);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<String> {
        vec!["amount".to_string(), "transaction_hour".to_string()]
    }

    /// Clustered normal points with a handful of far outliers.
    fn clustered_matrix(n: usize) -> Vec<Vec<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        (0..n)
            .map(|_| {
                vec![
                    80.0 + rng.gen_range(0.0..40.0),
                    rng.gen_range(0.0..24.0f64).floor(),
                ]
            })
            .collect()
    }

    #[test]
    fn test_fit_rejects_empty_dataset() {
        let err = IsolationForest::fit(&[], schema(), &ForestParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn test_fit_rejects_non_finite_values() {
        let matrix = vec![vec![100.0, 3.0], vec![f64::NAN, 5.0]];
        let err = IsolationForest::fit(&matrix, schema(), &ForestParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFeature { row: 1, column: 0 }));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let matrix = clustered_matrix(300);
        let params = ForestParams {
            seed: 99,
            ..Default::default()
        };

        let a = IsolationForest::fit(&matrix, schema(), &params).unwrap();
        let b = IsolationForest::fit(&matrix, schema(), &params).unwrap();

        assert_eq!(a.threshold(), b.threshold());
        for probe in [[100.0, 12.0], [5_000.0, 3.0], [0.0, 0.0]] {
            assert_eq!(
                a.decision_function(&probe).unwrap(),
                b.decision_function(&probe).unwrap()
            );
        }
    }

    #[test]
    fn test_outlier_scores_lower_than_center() {
        let matrix = clustered_matrix(500);
        let forest = IsolationForest::fit(&matrix, schema(), &ForestParams::default()).unwrap();

        let center = forest.decision_function(&[100.0, 12.0]).unwrap();
        let outlier = forest.decision_function(&[1_000_000.0, 12.0]).unwrap();

        assert!(
            outlier < center,
            "outlier score ({outlier}) should be below center score ({center})"
        );
    }

    #[test]
    fn test_threshold_calibration_matches_contamination() {
        let matrix = clustered_matrix(400);
        let params = ForestParams {
            contamination: 0.05,
            ..Default::default()
        };
        let forest = IsolationForest::fit(&matrix, schema(), &params).unwrap();

        let flagged = matrix
            .iter()
            .filter(|row| forest.predict(row).unwrap())
            .count();
        let expected = (0.05 * matrix.len() as f64).round() as usize;

        assert!(
            flagged.abs_diff(expected) <= 1,
            "flagged {flagged} of {} training points, expected ~{expected}",
            matrix.len()
        );
    }

    #[test]
    fn test_wrong_length_vector_is_schema_error() {
        let matrix = clustered_matrix(50);
        let forest = IsolationForest::fit(&matrix, schema(), &ForestParams::default()).unwrap();

        let err = forest.decision_function(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, PipelineError::ModelSchema(_)));
    }

    #[test]
    fn test_average_path_length_known_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        // c(2) = 2(ln 1 + gamma) - 2*1/2 = 2*gamma - 1
        let c2 = average_path_length(2);
        assert!((c2 - (2.0 * 0.5772156649 - 1.0)).abs() < 1e-9);
        let c256 = average_path_length(256);
        assert!(c256 > 10.0 && c256 < 13.0);
    }

    #[test]
    fn test_subsample_without_replacement_is_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let picked = sample_without_replacement(100, 40, &mut rng);
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();

        assert_eq!(picked.len(), 40);
        assert_eq!(unique.len(), 40);
        assert!(picked.iter().all(|&i| i < 100));
    }

    #[test]
    fn test_duplicate_heavy_data_does_not_degenerate() {
        // Identical rows: every tree collapses to a leaf, scoring still works
        let matrix = vec![vec![100.0, 12.0]; 64];
        let forest = IsolationForest::fit(&matrix, schema(), &ForestParams::default()).unwrap();

        let score = forest.decision_function(&[100.0, 12.0]).unwrap();
        assert!(score.is_finite());
    }
}
