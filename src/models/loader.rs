//! Persisted artifact loading.
//!
//! Reads the fixed set of named artifacts from the models directory at
//! process start: per-model scoring backends, the shared standard scaler,
//! the label encoder, and the training-run comparison metadata. Individual
//! unreadable files are skipped with a warning rather than failing startup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::backend::ScoringBackend;
use crate::types::label::QualityLabel;

/// Fixed roster of model artifact files the loader looks for.
pub const MODEL_FILES: [(&str, &str); 3] = [
    ("logistic_regression", "logistic_regression.json"),
    ("gaussian_nb", "gaussian_nb.json"),
    ("decision_tree", "decision_tree.json"),
];

pub const SCALER_FILE: &str = "scaler.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const COMPARISON_FILE: &str = "model_comparison.json";

/// Immutable binding between a model name and its scoring function.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub backend: ScoringBackend,
}

/// Per-feature standardization fitted during training.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Transform a raw vector into the scaled space the models expect.
    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let mean = self.mean.get(i).copied().unwrap_or(0.0);
                let scale = self.scale.get(i).copied().unwrap_or(1.0);
                if scale.abs() < f64::EPSILON {
                    x - mean
                } else {
                    (x - mean) / scale
                }
            })
            .collect()
    }
}

/// Ordered class vocabulary mapping raw class indices to public labels.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<QualityLabel>,
}

impl LabelEncoder {
    /// Fallback vocabulary in the training pipeline's alphabetical class
    /// order, used when no encoder artifact is present.
    pub fn positional_fallback() -> Self {
        Self {
            classes: vec![QualityLabel::Good, QualityLabel::NotGood],
        }
    }

    pub fn decode(&self, class_index: usize) -> Option<QualityLabel> {
        self.classes.get(class_index).copied()
    }
}

/// Training-run metadata naming the best-performing model.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonInfo {
    pub best_model: String,
    #[serde(default)]
    pub best_accuracy: Option<f64>,
}

/// Loader for the persisted artifact directory.
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every model on the fixed roster that exists and parses.
    pub fn load_all_models(&self, models_dir: &Path) -> Vec<LoadedModel> {
        let mut models = Vec::new();

        for (name, filename) in &MODEL_FILES {
            let path = models_dir.join(filename);
            if !path.exists() {
                warn!(model = %name, path = %path.display(), "Model artifact not found");
                continue;
            }
            match self.load_model(&path, name) {
                Ok(model) => models.push(model),
                Err(e) => {
                    warn!(model = %name, error = %e, "Failed to load model, skipping");
                }
            }
        }

        info!(
            count = models.len(),
            dir = %models_dir.display(),
            "Model artifacts loaded"
        );
        models
    }

    /// Load a single model artifact file.
    pub fn load_model(&self, path: &Path, name: &str) -> Result<LoadedModel> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let backend: ScoringBackend = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse model artifact {}", path.display()))?;

        info!(model = %name, kind = %backend.kind(), "Model loaded");

        Ok(LoadedModel {
            name: name.to_string(),
            backend,
        })
    }

    /// Load the shared scaler, if present and parseable.
    pub fn load_scaler(&self, models_dir: &Path) -> Option<StandardScaler> {
        self.load_optional(models_dir.join(SCALER_FILE), "scaler")
    }

    /// Load the label encoder, if present and parseable.
    pub fn load_label_encoder(&self, models_dir: &Path) -> Option<LabelEncoder> {
        self.load_optional(models_dir.join(LABEL_ENCODER_FILE), "label encoder")
    }

    /// Load the model-comparison metadata, if present and parseable.
    pub fn load_comparison_info(&self, models_dir: &Path) -> Option<ComparisonInfo> {
        self.load_optional(models_dir.join(COMPARISON_FILE), "comparison metadata")
    }

    fn load_optional<T: for<'de> Deserialize<'de>>(
        &self,
        path: std::path::PathBuf,
        what: &str,
    ) -> Option<T> {
        if !path.exists() {
            warn!(artifact = %what, path = %path.display(), "Artifact not found");
            return None;
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(anyhow::Error::from))
        {
            Ok(value) => {
                info!(artifact = %what, path = %path.display(), "Artifact loaded");
                Some(value)
            }
            Err(e) => {
                warn!(artifact = %what, error = %e, "Failed to load artifact, skipping");
                None
            }
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
