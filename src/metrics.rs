//! Performance metrics and statistics tracking for the anomaly detection pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total transactions processed
    pub transactions_processed: AtomicU64,
    /// Total alerts generated
    pub alerts_generated: AtomicU64,
    /// Per-record scoring failures (caught, logged, skipped)
    pub scoring_errors: AtomicU64,
    /// Alerts by severity
    alerts_by_severity: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Anomaly score distribution buckets over [-0.5, 0.5)
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_processed: AtomicU64::new(0),
            alerts_generated: AtomicU64::new(0),
            scoring_errors: AtomicU64::new(0),
            alerts_by_severity: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a processed transaction
    pub fn record_transaction(&self, processing_time: Duration, anomaly_score: f64) {
        self.transactions_processed.fetch_add(1, Ordering::Relaxed);

        // Record processing time
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        // Decision scores live in [-0.5, 0.5); shift into bucket range
        let bucket = (((anomaly_score + 0.5) * 10.0).max(0.0)).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record an alert
    pub fn record_alert(&self, severity: &str) {
        self.alerts_generated.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_severity) = self.alerts_by_severity.write() {
            *by_severity.entry(severity.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a per-record scoring failure
    pub fn record_error(&self) {
        self.scoring_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (transactions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Get alerts by severity
    pub fn get_alerts_by_severity(&self) -> HashMap<String, u64> {
        self.alerts_by_severity
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let tx_count = self.transactions_processed.load(Ordering::Relaxed);
        let alert_count = self.alerts_generated.load(Ordering::Relaxed);
        let error_count = self.scoring_errors.load(Ordering::Relaxed);
        let alert_rate = if tx_count > 0 {
            (alert_count as f64 / tx_count as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let alerts_by_severity = self.get_alerts_by_severity();
        let score_dist = self.get_score_distribution();

        info!("=== ANOMALY DETECTION PIPELINE - METRICS SUMMARY ===");
        info!(
            "Transactions processed: {} | throughput: {:.1} tx/s",
            tx_count, throughput
        );
        info!(
            "Alerts generated: {} ({:.1}%) | scoring errors: {}",
            alert_count, alert_rate, error_count
        );
        info!(
            "Processing time (us): mean={} p50={} p95={} p99={} max={}",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us, processing.max_us
        );
        for (severity, count) in &alerts_by_severity {
            let pct = if alert_count > 0 {
                (*count as f64 / alert_count as f64) * 100.0
            } else {
                0.0
            };
            info!("Alerts [{}]: {} ({:.1}%)", severity, count, pct);
        }
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let lo = i as f64 / 10.0 - 0.5;
            info!("Score bucket [{:.1}, {:.1}): {} ({:.1}%)", lo, lo + 0.1, count, pct);
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_transaction(Duration::from_micros(100), 0.1);
        metrics.record_transaction(Duration::from_micros(200), -0.2);
        metrics.record_alert("high");
        metrics.record_alert("low");
        metrics.record_error();

        assert_eq!(metrics.transactions_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.alerts_generated.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.scoring_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_score_buckets_cover_decision_range() {
        let metrics = PipelineMetrics::new();

        metrics.record_transaction(Duration::from_micros(50), -0.49);
        metrics.record_transaction(Duration::from_micros(50), 0.0);
        metrics.record_transaction(Duration::from_micros(50), 0.49);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
        assert_eq!(dist.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100u64, 200, 300, 400] {
            metrics.record_transaction(Duration::from_micros(us), 0.0);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
