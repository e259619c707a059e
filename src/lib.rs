//! Wine Quality Prediction & Model-Consensus Service
//!
//! Scores a normalized 11-feature wine sample against several persisted
//! classifiers, reconciles their verdicts into a single consensus, and
//! attaches a best-effort AI-generated explanation to single-model
//! predictions.

pub mod config;
pub mod error;
pub mod explain;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod types;

pub use config::AppConfig;
pub use error::{ServiceError, ValidationError};
pub use explain::ExplanationGateway;
pub use models::consensus::ConsensusResult;
pub use models::inference::InferenceEngine;
pub use models::registry::ModelRegistry;
pub use normalizer::{FeatureNormalizer, FeatureVector};
pub use orchestrator::PredictionOrchestrator;
pub use types::label::QualityLabel;
