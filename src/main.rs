//! Wine Quality Prediction Service - Main Entry Point
//!
//! Loads the persisted model artifacts, reads one JSON feature payload
//! from stdin, runs a single prediction or a multi-model comparison, and
//! prints the JSON response.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use wine_quality_service::{
    config::AppConfig, explain::ExplanationGateway, metrics::ServiceMetrics,
    models::registry::ModelRegistry, normalizer::RawFeatures,
    orchestrator::PredictionOrchestrator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config)?;

    info!("Starting Wine Quality Prediction Service");

    let registry = Arc::new(ModelRegistry::load(
        Path::new(&config.models.models_dir),
        &config.models.primary_model,
    ));
    let registry_info = registry.info();
    info!(
        models = ?registry_info.model_names,
        primary = %registry_info.primary_model,
        "Model registry ready"
    );
    for degradation in registry.degradations() {
        warn!(degradation = %degradation, "Running degraded");
    }

    let gateway = ExplanationGateway::from_config(&config.explanation)?;
    let metrics = Arc::new(ServiceMetrics::new());
    let orchestrator = PredictionOrchestrator::new(registry, gateway, metrics.clone());

    let operation = std::env::args().nth(1).unwrap_or_else(|| "predict".to_string());

    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read request payload from stdin")?;
    let raw: RawFeatures =
        serde_json::from_str(&payload).context("Request payload is not a JSON object")?;

    let output = match operation.as_str() {
        "predict" => {
            let response = orchestrator.predict(&raw).await?;
            serde_json::to_string_pretty(&response)?
        }
        "compare" => {
            let response = orchestrator.compare(&raw)?;
            serde_json::to_string_pretty(&response)?
        }
        other => bail!("unknown operation '{other}' (expected 'predict' or 'compare')"),
    };

    println!("{output}");
    metrics.print_summary();

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("wine_quality_service={}", config.logging.level).parse()?,
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
