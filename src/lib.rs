//! Transaction Anomaly Detection Pipeline Library
//!
//! A real-time anomaly detection pipeline for financial transactions built
//! around a native isolation-forest ensemble: events stream in, each is
//! reduced to a fixed-order feature vector, scored against a trained model,
//! and anomalous transactions trigger alerts.

pub mod config;
pub mod consumer;
pub mod error;
pub mod evaluation;
pub mod feature_extractor;
pub mod metrics;
pub mod model;
pub mod producer;
pub mod scoring;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::PipelineError;
pub use feature_extractor::FeatureExtractor;
pub use model::{ForestParams, IsolationForest, ModelArtifact};
pub use producer::AlertProducer;
pub use scoring::{ScoringResult, ScoringService};
pub use training::TrainingPipeline;
pub use types::{alert::AnomalyAlert, transaction::TransactionRecord};
