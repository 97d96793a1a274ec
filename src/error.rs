//! Error taxonomy for the anomaly detection pipeline

use thiserror::Error;

/// Errors produced by feature extraction, training, scoring, and artifact I/O.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A record carries malformed or out-of-range fields.
    #[error("schema error: {0}")]
    Schema(String),

    /// Non-finite values (NaN or infinity) entered the training matrix.
    #[error("invalid feature at row {row}, column {column}: value is not finite")]
    InvalidFeature { row: usize, column: usize },

    /// Training was attempted on an empty feature matrix.
    #[error("cannot fit model on an empty dataset")]
    EmptyDataset,

    /// A feature vector does not match the schema a model was trained with.
    #[error("model schema mismatch: {0}")]
    ModelSchema(String),

    /// The model artifact is corrupt or incompatible.
    #[error("artifact error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}
