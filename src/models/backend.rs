//! Tagged-variant scoring backends.
//!
//! Heterogeneous model kinds are exposed through one capability: given a
//! preprocessed feature slice, return per-class probabilities. Artifacts
//! are JSON exports of the offline training run.

use serde::Deserialize;
use thiserror::Error;

/// Scoring failure for one backend invocation.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("malformed tree: node index {0} out of range")]
    BadTreeNode(usize),

    #[error("model produced no class probabilities")]
    EmptyOutput,
}

/// A persisted scoring function, deserialized from a model artifact file.
///
/// Probability vectors are indexed by raw class index; the label encoder
/// owns the mapping to the public vocabulary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringBackend {
    /// Binary logistic regression. The sigmoid output is the probability
    /// of class 1; class 0 gets the complement.
    LogisticRegression { weights: Vec<f64>, intercept: f64 },

    /// Gaussian naive Bayes over all classes.
    GaussianNb {
        class_priors: Vec<f64>,
        /// Per-class, per-feature means.
        means: Vec<Vec<f64>>,
        /// Per-class, per-feature variances.
        variances: Vec<Vec<f64>>,
    },

    /// Single decision tree, stored as a flat node array rooted at 0.
    DecisionTree { nodes: Vec<TreeNode> },
}

/// One node of a flattened decision tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: Vec<f64>,
    },
}

impl ScoringBackend {
    /// Short kind tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::GaussianNb { .. } => "gaussian_nb",
            Self::DecisionTree { .. } => "decision_tree",
        }
    }

    /// Score a preprocessed feature slice into per-class probabilities.
    ///
    /// Stateless and side-effect-free; the backend is never mutated.
    pub fn score(&self, features: &[f64]) -> Result<Vec<f64>, ScoringError> {
        match self {
            Self::LogisticRegression { weights, intercept } => {
                if weights.len() != features.len() {
                    return Err(ScoringError::DimensionMismatch {
                        expected: weights.len(),
                        actual: features.len(),
                    });
                }
                let z: f64 = weights
                    .iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + intercept;
                let p1 = sigmoid(z);
                Ok(vec![1.0 - p1, p1])
            }

            Self::GaussianNb {
                class_priors,
                means,
                variances,
            } => {
                if class_priors.is_empty() {
                    return Err(ScoringError::EmptyOutput);
                }
                let mut log_posteriors = Vec::with_capacity(class_priors.len());
                for (c, prior) in class_priors.iter().enumerate() {
                    let class_means = means.get(c).ok_or(ScoringError::EmptyOutput)?;
                    let class_vars = variances.get(c).ok_or(ScoringError::EmptyOutput)?;
                    if class_means.len() != features.len() || class_vars.len() != features.len() {
                        return Err(ScoringError::DimensionMismatch {
                            expected: class_means.len(),
                            actual: features.len(),
                        });
                    }
                    let mut log_p = prior.max(f64::MIN_POSITIVE).ln();
                    for ((x, mean), var) in features.iter().zip(class_means).zip(class_vars) {
                        let var = var.max(1e-9);
                        log_p -= 0.5 * ((2.0 * std::f64::consts::PI * var).ln());
                        log_p -= (x - mean).powi(2) / (2.0 * var);
                    }
                    log_posteriors.push(log_p);
                }
                Ok(softmax_from_log(&log_posteriors))
            }

            Self::DecisionTree { nodes } => {
                let mut idx = 0usize;
                // Bounded by node count so a malformed artifact cannot loop.
                for _ in 0..=nodes.len() {
                    match nodes.get(idx).ok_or(ScoringError::BadTreeNode(idx))? {
                        TreeNode::Leaf { probabilities } => {
                            if probabilities.is_empty() {
                                return Err(ScoringError::EmptyOutput);
                            }
                            return Ok(probabilities.clone());
                        }
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            let value = features
                                .get(*feature)
                                .ok_or(ScoringError::DimensionMismatch {
                                    expected: *feature + 1,
                                    actual: features.len(),
                                })?;
                            idx = if *value <= *threshold { *left } else { *right };
                        }
                    }
                }
                Err(ScoringError::BadTreeNode(idx))
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Normalize log-space scores into probabilities without overflow.
fn softmax_from_log(log_scores: &[f64]) -> Vec<f64> {
    let max = log_scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = log_scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
