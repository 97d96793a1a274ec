//! Configuration management for the anomaly detection pipeline

use crate::model::forest::{
    ForestParams, DEFAULT_CONTAMINATION, DEFAULT_N_ESTIMATORS, DEFAULT_SUBSAMPLE_SIZE,
};
use crate::types::alert::SeverityThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions
    pub transaction_subject: String,
    /// Subject for outgoing anomaly alerts
    pub alert_subject: String,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the trained model artifact
    pub artifact_path: String,
    /// Alert severity margins below the decision threshold
    #[serde(default)]
    pub severity: SeverityThresholds,
}

/// Training hyperparameters
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Path to the historical training records (JSON lines)
    pub data_path: String,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_subsample_size")]
    pub subsample_size: usize,
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_estimators() -> usize {
    DEFAULT_N_ESTIMATORS
}

fn default_subsample_size() -> usize {
    DEFAULT_SUBSAMPLE_SIZE
}

fn default_contamination() -> f64 {
    DEFAULT_CONTAMINATION
}

fn default_seed() -> u64 {
    42
}

impl TrainingConfig {
    /// Convert to forest hyperparameters.
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            subsample_size: self.subsample_size,
            contamination: self.contamination,
            seed: self.seed,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrently processed transactions
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
    /// NATS queue group; when set, multiple pipeline instances share the
    /// transaction stream instead of each receiving every record
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file location.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                alert_subject: "anomaly.alerts".to_string(),
            },
            model: ModelConfig {
                artifact_path: "models/isolation_forest.json".to_string(),
                severity: SeverityThresholds::default(),
            },
            training: TrainingConfig {
                data_path: "data/transactions.jsonl".to_string(),
                n_estimators: DEFAULT_N_ESTIMATORS,
                subsample_size: DEFAULT_SUBSAMPLE_SIZE,
                contamination: DEFAULT_CONTAMINATION,
                seed: 42,
            },
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: 30,
                queue_group: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.training.contamination, DEFAULT_CONTAMINATION);
        assert_eq!(config.training.n_estimators, 100);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_queue_group_defaults_to_none() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"workers": 2, "metrics_interval_secs": 10}"#).unwrap();
        assert!(config.queue_group.is_none());

        let config: PipelineConfig = serde_json::from_str(
            r#"{"workers": 2, "metrics_interval_secs": 10, "queue_group": "scorers"}"#,
        )
        .unwrap();
        assert_eq!(config.queue_group.as_deref(), Some("scorers"));
    }

    #[test]
    fn test_forest_params_from_training_config() {
        let config = AppConfig::default();
        let params = config.training.forest_params();
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.subsample_size, 256);
        assert_eq!(params.seed, 42);
    }
}
