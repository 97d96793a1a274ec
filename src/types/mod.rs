//! Type definitions for the anomaly detection pipeline

pub mod alert;
pub mod transaction;

pub use alert::{AnomalyAlert, Severity};
pub use transaction::TransactionRecord;
