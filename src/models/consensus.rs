//! Consensus aggregation over per-model results.
//!
//! A pure, deterministic fold: the consensus label is the label with the
//! strictly largest group of scored results; exact ties break on the
//! higher summed confidence, then on the fixed label ordering. Summary
//! statistics cover every scored result, not just the winning group.

use serde::Serialize;

use crate::error::ServiceError;
use crate::models::inference::ModelResult;
use crate::types::label::QualityLabel;

/// Read-only aggregate over a non-empty set of model results.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusResult {
    pub consensus: QualityLabel,
    /// Number of models whose label matches the consensus label.
    pub agreement_count: usize,
    /// Number of models attempted, scored or failed.
    pub total_models: usize,
    pub average_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Identifier of the single highest-confidence model, independent of
    /// which label it predicted.
    pub best_model: String,
}

/// Builds consensus verdicts from batches of model results.
pub struct ConsensusBuilder;

impl ConsensusBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate a batch of model results into a single consensus verdict.
    ///
    /// Fails with `InsufficientData` when no result carries a usable score
    /// (empty input, or every model failed).
    pub fn build_consensus(&self, results: &[ModelResult]) -> Result<ConsensusResult, ServiceError> {
        let scored: Vec<(&str, QualityLabel, f64)> = results
            .iter()
            .filter_map(|r| {
                r.scored()
                    .map(|(label, confidence)| (r.model_name.as_str(), label, confidence))
            })
            .collect();

        if scored.is_empty() {
            return Err(ServiceError::InsufficientData);
        }

        // Two-valued vocabulary: one bucket per label, folded in a single
        // pass so repeated calls on the same input always agree.
        let mut groups: [(QualityLabel, usize, f64); 2] = [
            (QualityLabel::Good, 0, 0.0),
            (QualityLabel::NotGood, 0, 0.0),
        ];
        for (_, label, confidence) in &scored {
            let bucket = &mut groups[*label as usize];
            bucket.1 += 1;
            bucket.2 += confidence;
        }

        // Largest group wins; ties break on summed confidence, then on the
        // fixed label ordering (the array is already in that order).
        let (consensus, agreement_count, _) = groups
            .iter()
            .copied()
            .max_by(|a, b| {
                a.1.cmp(&b.1)
                    .then(a.2.total_cmp(&b.2))
                    // Stable preference for the earlier (smaller) label.
                    .then(b.0.cmp(&a.0))
            })
            .unwrap_or(groups[0]);

        let confidences: Vec<f64> = scored.iter().map(|(_, _, c)| *c).collect();
        let average_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let min_confidence = confidences.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_confidence = confidences
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let best_model = scored
            .iter()
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(name, _, _)| name.to_string())
            .unwrap_or_default();

        Ok(ConsensusResult {
            consensus,
            agreement_count,
            total_models: results.len(),
            average_confidence,
            min_confidence,
            max_confidence,
            best_model,
        })
    }
}

impl Default for ConsensusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
