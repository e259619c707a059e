//! Response shapes for the two public operations

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::consensus::ConsensusResult;
use crate::models::inference::ModelResult;
use crate::types::label::QualityLabel;

/// Single-model prediction response.
///
/// `label`, `confidence`, `model_used` and `timestamp` are always present;
/// `explanation` only when the gateway produced one.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub label: QualityLabel,
    pub confidence: f64,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Multi-model comparison response. Never partial.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResponse {
    #[serde(flatten)]
    pub consensus: ConsensusResult,
    pub per_model_results: Vec<ModelResult>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::ScoreOutcome;

    #[test]
    fn test_prediction_response_omits_absent_explanation() {
        let response = PredictionResponse {
            label: QualityLabel::Good,
            confidence: 0.82,
            model_used: "decision_tree".to_string(),
            timestamp: Utc::now(),
            explanation: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["label"], "good");
        assert_eq!(json["model_used"], "decision_tree");
        assert!(json.get("explanation").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_comparison_response_shape() {
        let response = ComparisonResponse {
            consensus: ConsensusResult {
                consensus: QualityLabel::NotGood,
                agreement_count: 2,
                total_models: 3,
                average_confidence: 0.65,
                min_confidence: 0.58,
                max_confidence: 0.71,
                best_model: "logistic_regression".to_string(),
            },
            per_model_results: vec![ModelResult {
                model_name: "logistic_regression".to_string(),
                outcome: ScoreOutcome::Scored {
                    label: QualityLabel::NotGood,
                    confidence: 0.71,
                },
                elapsed_us: 12,
            }],
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["consensus"], "not good");
        assert_eq!(json["agreement_count"], 2);
        assert_eq!(json["total_models"], 3);
        assert_eq!(json["per_model_results"][0]["label"], "not good");
    }
}
