//! Isolation-forest model and its serialized artifact

pub mod artifact;
pub mod forest;

pub use artifact::{ModelArtifact, TrainingMetadata};
pub use forest::{ForestParams, IsolationForest, IsolationTree};
