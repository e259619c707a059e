//! Process-lifetime model registry.
//!
//! Populated once at startup from the persisted artifact directory and
//! never mutated afterwards, so it is safe for unlimited concurrent
//! readers behind an `Arc`. Missing artifacts degrade capabilities rather
//! than failing startup; requests that need a missing capability fail at
//! call time instead.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::models::loader::{ComparisonInfo, LabelEncoder, LoadedModel, ModelLoader, StandardScaler};

/// A capability the registry started without.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// No model artifacts at all; every prediction fails at call time.
    NoModels,
    /// Vectors are scored unscaled.
    MissingScaler,
    /// Raw class indices decode through the positional fallback vocabulary.
    MissingLabelEncoder,
    /// No training metadata; the configured primary model name applies.
    MissingComparisonInfo,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoModels => "no models loaded, predictions will fail at call time",
            Self::MissingScaler => "no scaler, vectors will be scored unscaled",
            Self::MissingLabelEncoder => {
                "no label encoder, predictions will use the positional fallback vocabulary"
            }
            Self::MissingComparisonInfo => {
                "no comparison metadata, primary model taken from configuration"
            }
        };
        f.write_str(msg)
    }
}

/// Startup summary for health reporting and logging.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryInfo {
    pub model_names: Vec<String>,
    pub primary_model: String,
    pub scaler_loaded: bool,
    pub label_encoder_loaded: bool,
    pub degradations: Vec<Degradation>,
}

/// Immutable set of ready-to-score models plus shared preprocessing
/// artifacts.
pub struct ModelRegistry {
    models: Vec<LoadedModel>,
    scaler: Option<StandardScaler>,
    encoder: LabelEncoder,
    encoder_loaded: bool,
    primary_model: String,
    degradations: Vec<Degradation>,
}

impl ModelRegistry {
    /// Load all artifacts from `models_dir`.
    ///
    /// `configured_primary` is the fallback primary-model name used when no
    /// comparison metadata designates one.
    pub fn load(models_dir: &Path, configured_primary: &str) -> Self {
        let loader = ModelLoader::new();
        let models = loader.load_all_models(models_dir);
        let scaler = loader.load_scaler(models_dir);
        let encoder = loader.load_label_encoder(models_dir);
        let comparison: Option<ComparisonInfo> = loader.load_comparison_info(models_dir);

        let mut degradations = Vec::new();
        if models.is_empty() {
            degradations.push(Degradation::NoModels);
        }
        if scaler.is_none() {
            degradations.push(Degradation::MissingScaler);
        }
        if encoder.is_none() {
            degradations.push(Degradation::MissingLabelEncoder);
        }
        if comparison.is_none() {
            degradations.push(Degradation::MissingComparisonInfo);
        }

        let primary_model = comparison
            .as_ref()
            .map(|c| c.best_model.clone())
            .unwrap_or_else(|| configured_primary.to_string());

        for degradation in &degradations {
            warn!(degradation = %degradation, "Registry starting degraded");
        }
        info!(
            models = models.len(),
            primary = %primary_model,
            degraded = !degradations.is_empty(),
            "Model registry initialized"
        );

        let encoder_loaded = encoder.is_some();
        Self {
            models,
            scaler,
            encoder: encoder.unwrap_or_else(LabelEncoder::positional_fallback),
            encoder_loaded,
            primary_model,
            degradations,
        }
    }

    /// Identifiers of every registered model.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn models(&self) -> &[LoadedModel] {
        &self.models
    }

    /// Lookup by model identifier.
    pub fn get(&self, name: &str) -> Option<&LoadedModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// The model used for single-prediction requests.
    pub fn primary(&self) -> Result<&LoadedModel, ServiceError> {
        self.get(&self.primary_model).ok_or_else(|| {
            ServiceError::model_unavailable(format!(
                "primary model '{}' not loaded",
                self.primary_model
            ))
        })
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_model
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    pub fn info(&self) -> RegistryInfo {
        RegistryInfo {
            model_names: self.models.iter().map(|m| m.name.clone()).collect(),
            primary_model: self.primary_model.clone(),
            scaler_loaded: self.scaler.is_some(),
            label_encoder_loaded: self.encoder_loaded,
            degradations: self.degradations.clone(),
        }
    }
}
