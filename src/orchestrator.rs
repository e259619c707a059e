//! Prediction orchestrator: the service entry point.
//!
//! Sequences Normalizer → Inference Engine → (Consensus Builder) →
//! Explanation Gateway and assembles the response. Validation and
//! model-availability failures propagate; explanation failures never do.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::explain::{ExplanationGateway, GenerativeClient};
use crate::metrics::ServiceMetrics;
use crate::models::consensus::ConsensusBuilder;
use crate::models::inference::InferenceEngine;
use crate::models::registry::ModelRegistry;
use crate::normalizer::{FeatureNormalizer, RawFeatures};
use crate::types::response::{ComparisonResponse, PredictionResponse};

/// Entry point wiring the pipeline components together. Shares the
/// read-only registry with the inference engine; safe for concurrent use
/// from any number of request handlers.
pub struct PredictionOrchestrator<C> {
    normalizer: FeatureNormalizer,
    registry: Arc<ModelRegistry>,
    engine: InferenceEngine,
    consensus: ConsensusBuilder,
    gateway: ExplanationGateway<C>,
    metrics: Arc<ServiceMetrics>,
}

impl<C: GenerativeClient> PredictionOrchestrator<C> {
    pub fn new(
        registry: Arc<ModelRegistry>,
        gateway: ExplanationGateway<C>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            normalizer: FeatureNormalizer::new(),
            engine: InferenceEngine::new(registry.clone()),
            consensus: ConsensusBuilder::new(),
            registry,
            gateway,
            metrics,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Predict with the primary model and a best-effort explanation.
    ///
    /// Dropping the returned future abandons any in-flight explanation
    /// call; the prediction itself is computed before the gateway runs.
    pub async fn predict(&self, raw: &RawFeatures) -> Result<PredictionResponse, ServiceError> {
        let request_id = Uuid::new_v4();
        let vector = self.normalizer.normalize(raw)?;

        let primary_name = self.registry.primary()?.name.clone();
        let result = self.engine.score(&vector, &primary_name)?;
        self.metrics
            .record_model_time(&result.model_name, result.elapsed_us);

        let (label, confidence) = result.scored().ok_or(ServiceError::InsufficientData)?;

        let explanation = self.gateway.explain(&vector, label, confidence).await;
        self.metrics.record_prediction(explanation.is_some());

        info!(
            request_id = %request_id,
            model = %result.model_name,
            label = %label,
            confidence = confidence,
            explained = explanation.is_some(),
            "Prediction served"
        );

        Ok(PredictionResponse {
            label,
            confidence,
            model_used: result.model_name,
            timestamp: Utc::now(),
            explanation,
        })
    }

    /// Score against every registered model and build the consensus.
    pub fn compare(&self, raw: &RawFeatures) -> Result<ComparisonResponse, ServiceError> {
        let request_id = Uuid::new_v4();
        let vector = self.normalizer.normalize(raw)?;

        let results = self.engine.score_all(&vector);
        if results.is_empty() {
            return Err(ServiceError::model_unavailable("no models loaded"));
        }
        for result in &results {
            self.metrics
                .record_model_time(&result.model_name, result.elapsed_us);
        }

        let consensus = self.consensus.build_consensus(&results)?;
        self.metrics
            .record_comparison(consensus.agreement_count, consensus.total_models);

        info!(
            request_id = %request_id,
            consensus = %consensus.consensus,
            agreement = consensus.agreement_count,
            total = consensus.total_models,
            best_model = %consensus.best_model,
            "Comparison served"
        );
        debug!(request_id = %request_id, results = ?results, "Per-model results");

        Ok(ComparisonResponse {
            consensus,
            per_model_results: results,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::ExplainError;
    use crate::models::loader::{COMPARISON_FILE, LABEL_ENCODER_FILE, SCALER_FILE};
    use crate::types::label::QualityLabel;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Client whose every attempt fails the same way.
    struct FixedClient(Result<String, ExplainError>);

    impl GenerativeClient for FixedClient {
        async fn generate(&self, _prompt: &str) -> Result<String, ExplainError> {
            self.0.clone()
        }
    }

    fn raw_input() -> RawFeatures {
        json!({
            "fixed_acidity": 7.4,
            "volatile_acidity": 0.7,
            "citric_acid": 0.0,
            "residual_sugar": 1.9,
            "chlorides": 0.076,
            "free_sulfur_dioxide": 11.0,
            "total_sulfur_dioxide": 34.0,
            "density": 0.9978,
            "ph": 3.51,
            "sulphates": 0.56,
            "alcohol": 9.4
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    /// Three models: tree and NB vote "not good", logistic votes "good".
    fn artifact_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "decision_tree.json",
            r#"{"kind": "decision_tree", "nodes": [{"probabilities": [0.29, 0.71]}]}"#,
        );
        write(
            &dir,
            "gaussian_nb.json",
            // Class 1 means sit on the sample's raw values, class 0 far away.
            &format!(
                r#"{{"kind": "gaussian_nb",
                    "class_priors": [0.5, 0.5],
                    "means": [{:?}, {:?}],
                    "variances": [{:?}, {:?}]}}"#,
                vec![100.0; 11],
                vec![7.4, 0.7, 0.0, 1.9, 0.076, 11.0, 34.0, 0.9978, 3.51, 0.56, 9.4],
                vec![1.0; 11],
                vec![1.0; 11]
            ),
        );
        write(
            &dir,
            "logistic_regression.json",
            // Negative logit: class 0 ("good") at sigmoid(2) ~= 0.88.
            &format!(
                r#"{{"kind": "logistic_regression", "weights": {:?}, "intercept": -2.0}}"#,
                vec![0.0; 11]
            ),
        );
        write(
            &dir,
            SCALER_FILE,
            &format!(
                r#"{{"mean": {:?}, "scale": {:?}}}"#,
                vec![0.0; 11],
                vec![1.0; 11]
            ),
        );
        write(&dir, LABEL_ENCODER_FILE, r#"{"classes": ["good", "not good"]}"#);
        write(
            &dir,
            COMPARISON_FILE,
            r#"{"best_model": "decision_tree", "best_accuracy": 0.91}"#,
        );
        dir
    }

    fn orchestrator(
        dir: &TempDir,
        client: Option<FixedClient>,
    ) -> PredictionOrchestrator<FixedClient> {
        let registry = Arc::new(ModelRegistry::load(dir.path(), "decision_tree"));
        let gateway = ExplanationGateway::new(
            client,
            Duration::from_millis(100),
            Duration::from_millis(10),
        );
        PredictionOrchestrator::new(registry, gateway, Arc::new(ServiceMetrics::new()))
    }

    #[tokio::test]
    async fn test_predict_with_explanation() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, Some(FixedClient(Ok("Earthy tannins.".to_string()))));

        let response = orchestrator.predict(&raw_input()).await.unwrap();
        assert_eq!(response.label, QualityLabel::NotGood);
        assert!((response.confidence - 0.71).abs() < 1e-12);
        assert_eq!(response.model_used, "decision_tree");
        assert_eq!(response.explanation.as_deref(), Some("Earthy tannins."));
    }

    #[tokio::test]
    async fn test_predict_survives_explanation_outage() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(
            &dir,
            Some(FixedClient(Err(ExplainError::Transient(
                "HTTP 503".to_string(),
            )))),
        );

        let response = orchestrator.predict(&raw_input()).await.unwrap();
        assert_eq!(response.label, QualityLabel::NotGood);
        assert!(response.explanation.is_none());
    }

    #[tokio::test]
    async fn test_predict_without_credential() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, None);

        let response = orchestrator.predict(&raw_input()).await.unwrap();
        assert!(response.explanation.is_none());
        assert_eq!(
            orchestrator
                .metrics()
                .explanations_degraded
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_predict_fails_fast_on_invalid_input() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, None);

        let mut input = raw_input();
        input.remove("sulphates");

        let err = orchestrator.predict(&input).await.unwrap_err();
        match err {
            ServiceError::Validation(v) => assert!(v.names_field("sulphates")),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_predict_with_empty_registry_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, None);

        let err = orchestrator.predict(&raw_input()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_compare_consensus_over_three_models() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, None);

        let response = orchestrator.compare(&raw_input()).unwrap();
        assert_eq!(response.consensus.consensus, QualityLabel::NotGood);
        assert_eq!(response.consensus.agreement_count, 2);
        assert_eq!(response.consensus.total_models, 3);
        assert_eq!(response.per_model_results.len(), 3);
        // The NB model sits exactly on the sample and wins on confidence.
        assert_eq!(response.consensus.best_model, "gaussian_nb");
    }

    #[tokio::test]
    async fn test_compare_is_deterministic() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, None);

        let first = orchestrator.compare(&raw_input()).unwrap();
        let second = orchestrator.compare(&raw_input()).unwrap();

        assert_eq!(first.consensus.consensus, second.consensus.consensus);
        assert_eq!(
            first.consensus.agreement_count,
            second.consensus.agreement_count
        );
        assert_eq!(
            first.consensus.average_confidence,
            second.consensus.average_confidence
        );
        assert_eq!(first.consensus.best_model, second.consensus.best_model);
    }

    #[tokio::test]
    async fn test_compare_with_ph_alias_matches() {
        let dir = artifact_dir();
        let orchestrator = orchestrator(&dir, None);

        let lower = orchestrator.compare(&raw_input()).unwrap();

        let mut upper_input = raw_input();
        let ph = upper_input.remove("ph").unwrap();
        upper_input.insert("pH".to_string(), ph);
        let upper = orchestrator.compare(&upper_input).unwrap();

        assert_eq!(lower.consensus.consensus, upper.consensus.consensus);
        assert_eq!(
            lower.consensus.average_confidence,
            upper.consensus.average_confidence
        );
    }

    #[tokio::test]
    async fn test_compare_with_empty_registry_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, None);

        let err = orchestrator.compare(&raw_input()).unwrap_err();
        assert!(matches!(err, ServiceError::ModelUnavailable { .. }));
    }
}
