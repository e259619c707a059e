//! Service metrics and statistics tracking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use tracing::info;

/// In-process metrics for the prediction service.
pub struct ServiceMetrics {
    /// Single predictions served
    pub predictions: AtomicU64,
    /// Comparison requests served
    pub comparisons: AtomicU64,
    /// Explanations successfully generated
    pub explanations_succeeded: AtomicU64,
    /// Explanations degraded to absent (failure or disabled capability)
    pub explanations_degraded: AtomicU64,
    /// Model scoring times in microseconds
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Per-comparison agreement ratios (agreement_count / total_models)
    agreement_ratios: RwLock<Vec<f64>>,
    start_time: Instant,
}

/// Per-model scoring latency summary.
#[derive(Debug, Clone)]
pub struct ModelStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            comparisons: AtomicU64::new(0),
            explanations_succeeded: AtomicU64::new(0),
            explanations_degraded: AtomicU64::new(0),
            model_times: RwLock::new(HashMap::new()),
            agreement_ratios: RwLock::new(Vec::with_capacity(256)),
            start_time: Instant::now(),
        }
    }

    pub fn record_prediction(&self, explanation_present: bool) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if explanation_present {
            self.explanations_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.explanations_degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_comparison(&self, agreement_count: usize, total_models: usize) {
        self.comparisons.fetch_add(1, Ordering::Relaxed);
        if total_models > 0 {
            if let Ok(mut ratios) = self.agreement_ratios.write() {
                ratios.push(agreement_count as f64 / total_models as f64);
                if ratios.len() > 10_000 {
                    ratios.drain(0..5_000);
                }
            }
        }
    }

    pub fn record_model_time(&self, model_name: &str, elapsed_us: u64) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_default();
            model_times.push(elapsed_us);
            if model_times.len() > 1_000 {
                model_times.drain(0..500);
            }
        }
    }

    /// Mean agreement ratio across comparisons served so far.
    pub fn avg_agreement(&self) -> f64 {
        let ratios = self.agreement_ratios.read().unwrap();
        if ratios.is_empty() {
            return 0.0;
        }
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }

    pub fn model_stats(&self) -> HashMap<String, ModelStats> {
        let times = self.model_times.read().unwrap();
        let mut stats = HashMap::new();

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }
            let mut sorted = model_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();
            stats.insert(
                model.clone(),
                ModelStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[(count as f64 * 0.99) as usize],
                },
            );
        }
        stats
    }

    /// Requests per second since startup.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let total = self.predictions.load(Ordering::Relaxed)
                + self.comparisons.load(Ordering::Relaxed);
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log a summary of the counters and per-model latencies.
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let comparisons = self.comparisons.load(Ordering::Relaxed);
        let succeeded = self.explanations_succeeded.load(Ordering::Relaxed);
        let degraded = self.explanations_degraded.load(Ordering::Relaxed);

        info!(
            predictions = predictions,
            comparisons = comparisons,
            explanations_succeeded = succeeded,
            explanations_degraded = degraded,
            avg_agreement = format!("{:.2}", self.avg_agreement()),
            throughput = format!("{:.1} req/s", self.throughput()),
            "Service metrics summary"
        );

        for (model, stats) in self.model_stats() {
            info!(
                model = %model,
                calls = stats.calls,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "Model scoring latency"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
