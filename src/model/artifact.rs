//! Self-describing serialized form of a trained isolation forest.
//!
//! The artifact carries everything a scoring consumer needs to validate
//! compatibility before use: algorithm identifier, format version, score
//! convention, and the ordered feature schema, alongside the hyperparameters,
//! the calibrated threshold, and the tree structures themselves.

use crate::error::PipelineError;
use crate::model::forest::{IsolationForest, IsolationTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Algorithm identifier embedded in every artifact.
pub const ALGORITHM: &str = "isolation_forest";

/// Artifact format version; bumped on incompatible layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Score sign convention: lower raw scores indicate anomalies.
pub const SCORE_CONVENTION: &str = "lower_is_anomalous";

/// Training-run metadata recorded alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetadata {
    /// Number of rows the model was trained on
    pub training_rows: usize,
    /// Seed used for tree construction
    pub seed: u64,
    /// When training completed
    pub trained_at: DateTime<Utc>,
}

/// Serialized, versioned form of a trained [`IsolationForest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub algorithm: String,
    pub format_version: u32,
    pub score_convention: String,
    /// Ordered feature schema the model was trained with
    pub feature_names: Vec<String>,
    pub n_estimators: usize,
    pub subsample_size: usize,
    pub contamination: f64,
    /// Decision threshold; scores below it are anomalous
    pub threshold: f64,
    pub metadata: TrainingMetadata,
    trees: Vec<IsolationTree>,
}

impl ModelArtifact {
    /// Package a trained forest with its training metadata.
    pub fn from_forest(forest: &IsolationForest, metadata: TrainingMetadata) -> Self {
        Self {
            algorithm: ALGORITHM.to_string(),
            format_version: FORMAT_VERSION,
            score_convention: SCORE_CONVENTION.to_string(),
            feature_names: forest.feature_names().to_vec(),
            n_estimators: forest.n_estimators(),
            subsample_size: forest.subsample_size(),
            contamination: forest.contamination(),
            threshold: forest.threshold(),
            metadata,
            trees: forest.trees().to_vec(),
        }
    }

    /// Reconstruct the forest; fails if the artifact is incompatible.
    pub fn to_forest(&self) -> Result<IsolationForest, PipelineError> {
        self.validate()?;
        Ok(IsolationForest::from_parts(
            self.trees.clone(),
            self.feature_names.clone(),
            self.subsample_size,
            self.contamination,
            self.threshold,
        ))
    }

    /// Check the self-describing header fields.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.algorithm != ALGORITHM {
            return Err(PipelineError::Serialization(format!(
                "unsupported algorithm {:?}, expected {:?}",
                self.algorithm, ALGORITHM
            )));
        }
        if self.format_version != FORMAT_VERSION {
            return Err(PipelineError::Serialization(format!(
                "unsupported artifact format version {}, expected {}",
                self.format_version, FORMAT_VERSION
            )));
        }
        if self.score_convention != SCORE_CONVENTION {
            return Err(PipelineError::Serialization(format!(
                "unsupported score convention {:?}, expected {:?}",
                self.score_convention, SCORE_CONVENTION
            )));
        }
        if self.trees.is_empty() {
            return Err(PipelineError::Serialization(
                "artifact contains no trees".to_string(),
            ));
        }
        if self.feature_names.is_empty() {
            return Err(PipelineError::Serialization(
                "artifact has an empty feature schema".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize and validate from JSON.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load and validate an artifact from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
