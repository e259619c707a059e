//! Best-effort AI explanation gateway.
//!
//! Issues one outbound call to a generative-AI endpoint with the
//! prediction context, bounded by a per-attempt timeout with at most one
//! retry on transient failure. Exhaustion, rejection, or an absent
//! credential all degrade to an absent explanation; this dependency never
//! blocks or fails prediction delivery.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ExplanationConfig;
use crate::normalizer::FeatureVector;
use crate::types::label::QualityLabel;

/// One retry after the initial attempt.
const MAX_ATTEMPTS: u8 = 2;

/// Failure modes of a single generation attempt.
#[derive(Debug, Clone, Error)]
pub enum ExplainError {
    /// The attempt exceeded the request timeout. Retryable.
    #[error("request timed out")]
    Timeout,

    /// Upstream 5xx, rate limit, or transport failure. Retryable.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Definitive client-side rejection (malformed request, bad
    /// credential). A programming error; never retried.
    #[error("request rejected by upstream: {0}")]
    Rejected(String),
}

impl ExplainError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transient(_))
    }
}

/// Explicit state machine for the timeout/retry/fallback policy, so the
/// policy is testable independent of the network.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplainState {
    Idle,
    Requesting { attempt: u8 },
    Retrying { attempt: u8 },
    /// Terminal: generated text.
    Succeeded(String),
    /// Terminal: retries exhausted; explanation is absent.
    Degraded(String),
    /// Terminal: definitive rejection; explanation is absent.
    Rejected(String),
    /// Terminal: capability not configured.
    Disabled,
}

impl ExplainState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::Degraded(_) | Self::Rejected(_) | Self::Disabled
        )
    }
}

/// A text-generation backend the gateway can call.
pub trait GenerativeClient {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, ExplainError>> + Send;
}

/// Gateway enforcing the timeout, retry, and fallback policy around a
/// generative client.
pub struct ExplanationGateway<C> {
    client: Option<C>,
    request_timeout: Duration,
    retry_backoff: Duration,
}

impl<C: GenerativeClient> ExplanationGateway<C> {
    /// `client` is `None` when the capability is not configured; every
    /// explanation request then resolves to `Disabled` without error.
    pub fn new(client: Option<C>, request_timeout: Duration, retry_backoff: Duration) -> Self {
        Self {
            client,
            request_timeout,
            retry_backoff,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Obtain a natural-language rationale for a prediction, or `None`
    /// when policy could not produce one. Never fails the caller.
    pub async fn explain(
        &self,
        vector: &FeatureVector,
        label: QualityLabel,
        confidence: f64,
    ) -> Option<String> {
        let prompt = build_prompt(vector, label, confidence);
        match self.run_policy(&prompt).await {
            ExplainState::Succeeded(text) => {
                debug!("Explanation generated");
                Some(text)
            }
            ExplainState::Disabled => {
                debug!("Explanation capability not configured");
                None
            }
            ExplainState::Degraded(reason) => {
                warn!(reason = %reason, "Explanation degraded after retries");
                None
            }
            ExplainState::Rejected(reason) => {
                warn!(reason = %reason, "Explanation request rejected, not retrying");
                None
            }
            // run_policy only returns terminal states.
            other => {
                warn!(state = ?other, "Explanation policy ended in non-terminal state");
                None
            }
        }
    }

    /// Drive the policy state machine to a terminal state.
    pub async fn run_policy(&self, prompt: &str) -> ExplainState {
        let Some(client) = &self.client else {
            return ExplainState::Disabled;
        };

        let mut state = ExplainState::Idle;
        loop {
            state = match state {
                ExplainState::Idle => ExplainState::Requesting { attempt: 1 },

                ExplainState::Requesting { attempt } => {
                    let outcome =
                        tokio::time::timeout(self.request_timeout, client.generate(prompt)).await;
                    match outcome {
                        Ok(Ok(text)) => ExplainState::Succeeded(text),
                        Ok(Err(e)) if !e.is_transient() => ExplainState::Rejected(e.to_string()),
                        Ok(Err(e)) => self.after_transient(attempt, e.to_string()),
                        Err(_) => self.after_transient(attempt, ExplainError::Timeout.to_string()),
                    }
                }

                ExplainState::Retrying { attempt } => {
                    tokio::time::sleep(self.retry_backoff).await;
                    ExplainState::Requesting {
                        attempt: attempt + 1,
                    }
                }

                terminal => return terminal,
            };
        }
    }

    fn after_transient(&self, attempt: u8, reason: String) -> ExplainState {
        if attempt < MAX_ATTEMPTS {
            debug!(attempt = attempt, reason = %reason, "Transient explanation failure, retrying");
            ExplainState::Retrying { attempt }
        } else {
            ExplainState::Degraded(reason)
        }
    }
}

impl ExplanationGateway<GeminiClient> {
    /// Build the gateway from configuration. An absent credential disables
    /// the capability without error.
    pub fn from_config(config: &ExplanationConfig) -> anyhow::Result<Self> {
        let client = match &config.api_key {
            Some(key) => {
                info!(model = %config.model, "Explanation gateway enabled");
                Some(GeminiClient::new(config, key.clone())?)
            }
            None => {
                info!("No explanation API credential configured, capability disabled");
                None
            }
        };

        Ok(Self::new(
            client,
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.retry_backoff_ms),
        ))
    }
}

/// Format the prediction context into the wine-expert prompt.
pub fn build_prompt(vector: &FeatureVector, label: QualityLabel, confidence: f64) -> String {
    let features = vector
        .iter_display()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    let confidence_percent = (confidence * 100.0).round() as i64;

    format!(
        "You are a wine expert analyzing wine quality based on chemical composition.\n\
         Wine Features: {features}\n\
         Predicted Quality: {label}\n\
         Confidence: {confidence_percent}%\n\
         \n\
         Please provide a brief, professional explanation (3-4 sentences) about this \
         wine's quality prediction. Focus on the key chemical factors that influenced \
         this prediction, what these values mean for wine quality, and general \
         characteristics of wines with this quality level. Keep the explanation \
         accessible to wine enthusiasts, not just experts."
    )
}

/// Gemini `generateContent` REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ExplanationConfig, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExplainError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExplainError::Timeout
                } else {
                    ExplainError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ExplainError::Transient(format!("HTTP {status}")));
        }
        if status.is_client_error() {
            return Err(ExplainError::Rejected(format!("HTTP {status}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExplainError::Transient(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ExplainError::Transient("empty response body".to_string()))
    }
}
