//! Error taxonomy for the prediction service.
//!
//! Validation and model-availability failures surface to the caller with
//! enough detail to fix the request. Explanation failures never reach the
//! caller; they live in [`crate::explain::ExplainError`] and degrade to an
//! absent explanation.

use std::fmt;

use thiserror::Error;

/// User-visible service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or incomplete input. The caller's fault; no retry.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A required model or preprocessing artifact is not loaded.
    /// Configuration or deployment issue; service-unavailable equivalent.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// Every attempted model failed to produce a usable result.
    #[error("no model produced a usable result")]
    InsufficientData,
}

impl ServiceError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }
}

/// Why a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// No accepted alias of the field was present.
    Missing,
    /// The value was not a number.
    NotNumeric,
    /// The value was NaN or infinite.
    NotFinite,
    /// More than one alias of the same field was supplied.
    AmbiguousAlias,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Missing => "missing",
            Self::NotNumeric => "not a number",
            Self::NotFinite => "not a finite number",
            Self::AmbiguousAlias => "supplied under more than one alias",
        };
        f.write_str(msg)
    }
}

/// One offending field in a rejected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Canonical field name.
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

/// Input rejection naming every offending field, not just the first.
#[derive(Debug, Clone, Error)]
pub struct ValidationError {
    pub field_errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(field_errors: Vec<FieldError>) -> Self {
        Self { field_errors }
    }

    /// True if the named canonical field is among the offenders.
    pub fn names_field(&self, field: &str) -> bool {
        self.field_errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input: ")?;
        for (i, err) in self.field_errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", err.field, err.kind)?;
        }
        Ok(())
    }
}
