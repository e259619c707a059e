//! Multi-model inference engine.
//!
//! Scores a normalized feature vector against one or all registered
//! models. Scoring is stateless: the scaler (when present) transforms the
//! vector, the backend produces per-class probabilities, and the label
//! encoder decodes the winning class into the public vocabulary.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::models::loader::LoadedModel;
use crate::models::registry::ModelRegistry;
use crate::normalizer::FeatureVector;
use crate::types::label::QualityLabel;

/// One model's verdict for a single inference call.
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub model_name: String,
    #[serde(flatten)]
    pub outcome: ScoreOutcome,
    /// Elapsed scoring time in microseconds.
    pub elapsed_us: u64,
}

/// Scored verdict or sentinel failure marker.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScoreOutcome {
    Scored {
        label: QualityLabel,
        confidence: f64,
    },
    Failed {
        error: String,
    },
}

impl ModelResult {
    pub fn scored(&self) -> Option<(QualityLabel, f64)> {
        match &self.outcome {
            ScoreOutcome::Scored { label, confidence } => Some((*label, *confidence)),
            ScoreOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ScoreOutcome::Failed { .. })
    }
}

/// Scores normalized vectors against the registry's models.
pub struct InferenceEngine {
    registry: Arc<ModelRegistry>,
}

impl InferenceEngine {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Score against a single named model.
    ///
    /// An unknown identifier is `ModelUnavailable`; a model that throws
    /// during scoring yields `InsufficientData` since the request produced
    /// no usable result.
    pub fn score(&self, vector: &FeatureVector, model_id: &str) -> Result<ModelResult, ServiceError> {
        let model = self.registry.get(model_id).ok_or_else(|| {
            ServiceError::model_unavailable(format!("model '{model_id}' not loaded"))
        })?;

        let result = self.run_model(model, vector);
        if result.is_failed() {
            warn!(model = %model_id, "Single-model scoring failed");
            return Err(ServiceError::InsufficientData);
        }
        Ok(result)
    }

    /// Score against every registered model, continuing past individual
    /// failures. A failed model is reported with a sentinel marker; the
    /// batch itself never errors. Result order carries no meaning.
    pub fn score_all(&self, vector: &FeatureVector) -> Vec<ModelResult> {
        self.registry
            .models()
            .iter()
            .map(|model| self.run_model(model, vector))
            .collect()
    }

    fn run_model(&self, model: &LoadedModel, vector: &FeatureVector) -> ModelResult {
        let start = Instant::now();
        let outcome = self.try_score(model, vector);
        let elapsed_us = start.elapsed().as_micros() as u64;

        match &outcome {
            ScoreOutcome::Scored { label, confidence } => {
                debug!(
                    model = %model.name,
                    label = %label,
                    confidence = confidence,
                    elapsed_us = elapsed_us,
                    "Model scored"
                );
            }
            ScoreOutcome::Failed { error } => {
                warn!(model = %model.name, error = %error, "Model scoring failed");
            }
        }

        ModelResult {
            model_name: model.name.clone(),
            outcome,
            elapsed_us,
        }
    }

    fn try_score(&self, model: &LoadedModel, vector: &FeatureVector) -> ScoreOutcome {
        let scaled;
        let features: &[f64] = match self.registry.scaler() {
            Some(scaler) => {
                scaled = scaler.transform(vector.as_slice());
                &scaled
            }
            None => vector.as_slice(),
        };

        let probabilities = match model.backend.score(features) {
            Ok(p) => p,
            Err(e) => {
                return ScoreOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let (class_index, &raw_confidence) = match probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        {
            Some(best) => best,
            None => {
                return ScoreOutcome::Failed {
                    error: "model produced no class probabilities".to_string(),
                }
            }
        };

        match self.registry.encoder().decode(class_index) {
            Some(label) => ScoreOutcome::Scored {
                label,
                confidence: raw_confidence.clamp(0.0, 1.0),
            },
            None => ScoreOutcome::Failed {
                error: format!("class index {class_index} outside label vocabulary"),
            },
        }
    }
}
